use serde::{Deserialize, Serialize};

use crate::types::{ChatTurn, GenerationOptions};

/// Body of a chat-completion request.
///
/// Built fresh for every call and not retained afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Identifier of the model, e.g. `openai/gpt-4o-mini`.
    pub model: String,

    /// Conversation history, oldest first.
    pub messages: Vec<ChatTurn>,

    /// Tuning parameters; unset ones are not sent.
    #[serde(flatten)]
    pub options: GenerationOptions,

    /// Whether the response should be streamed as line frames.
    pub stream: bool,
}

impl GenerationRequest {
    /// Compose a request from a model, tuning options and the turn history.
    ///
    /// This performs no I/O and does not touch session state.
    pub fn build(
        model: impl Into<String>,
        options: &GenerationOptions,
        turns: &[ChatTurn],
        stream: bool,
    ) -> Self {
        Self {
            model: model.into(),
            messages: turns.to_vec(),
            options: options.clone(),
            stream,
        }
    }

    /// Create a request with no tuning options.
    pub fn new(model: impl Into<String>, turns: Vec<ChatTurn>) -> Self {
        Self {
            model: model.into(),
            messages: turns,
            options: GenerationOptions::default(),
            stream: false,
        }
    }

    /// Replace the tuning options.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the stream flag.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
