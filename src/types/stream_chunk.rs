use serde::{Deserialize, Serialize};

/// One decoded frame of a streamed chat completion.
///
/// Providers disagree on where the incremental text lives, so every known location
/// is optional and [`StreamChunk::text`] picks the first non-empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Nested incremental content: `{"delta": {"content": "..."}}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ChunkDelta>,

    /// OpenAI-compatible form: `{"choices": [{"delta": {"content": "..."}}]}`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChunkChoice>,

    /// Flat content: `{"content": "..."}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Incremental content of a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// The text fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One choice of an OpenAI-compatible frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content for this choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ChunkDelta>,
}

impl StreamChunk {
    /// The text fragment carried by this frame, if any.
    pub fn text(&self) -> Option<&str> {
        let nested = self.delta.as_ref().and_then(|d| d.content.as_deref());
        let choice = self
            .choices
            .first()
            .and_then(|c| c.delta.as_ref())
            .and_then(|d| d.content.as_deref());
        [nested, choice, self.content.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
    }
}
