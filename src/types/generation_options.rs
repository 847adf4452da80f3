use serde::{Deserialize, Serialize};

/// Optional tuning parameters for a chat completion.
///
/// Every field left as `None` is omitted from the request body so the service
/// applies its own default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Nucleus sampling probability mass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Penalty applied to tokens by how often they already appeared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Penalty applied to tokens that already appeared at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl GenerationOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the frequency penalty.
    pub fn with_frequency_penalty(mut self, penalty: Option<f32>) -> Self {
        self.frequency_penalty = penalty;
        self
    }

    /// Sets the presence penalty.
    pub fn with_presence_penalty(mut self, penalty: Option<f32>) -> Self {
        self.presence_penalty = penalty;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_serialize_to_empty_object() {
        let json = serde_json::to_value(GenerationOptions::new()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn builder_sets_fields() {
        let options = GenerationOptions::new()
            .with_temperature(Some(0.5))
            .with_max_tokens(Some(256))
            .with_top_p(Some(0.9))
            .with_frequency_penalty(Some(0.0))
            .with_presence_penalty(None);
        assert_eq!(options.temperature, Some(0.5));
        assert_eq!(options.max_tokens, Some(256));
        assert_eq!(options.top_p, Some(0.9));
        assert_eq!(options.frequency_penalty, Some(0.0));
        assert!(options.presence_penalty.is_none());
    }
}
