use serde::{Deserialize, Serialize};

/// Result of a buffered (non-streaming) chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Text of the first choice; empty when the response carried none.
    pub content: String,
}

impl From<ChatCompletionResponse> for ChatCompletion {
    fn from(response: ChatCompletionResponse) -> Self {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();
        Self { content }
    }
}

/// Wire shape of a chat-completion response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated alternatives; only the first is used.
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

/// One generated alternative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChoice {
    /// The generated message.
    #[serde(default)]
    pub message: Option<CompletionMessage>,
}

/// Message inside a [`CompletionChoice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// Role reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Generated text.
    #[serde(default)]
    pub content: Option<String>,
}
