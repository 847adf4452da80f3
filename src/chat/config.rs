//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the configuration
//! structure handed to [`ChatController`](super::ChatController) at construction.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::types::GenerationOptions;

/// Model used when neither the session nor the command line names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Command-line arguments for the ghmodels-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: openai/gpt-4o-mini)", "MODEL")]
    pub model: Option<String>,

    /// Organization to attribute requests to.
    #[arrrg(optional, "Organization to bill requests to", "ORG")]
    pub organization: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: model default)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Directory holding saved chats.
    #[arrrg(optional, "Directory for saved chats (default: in-memory only)", "DIR")]
    pub store_dir: Option<String>,

    /// Wait for complete replies instead of streaming.
    #[arrrg(flag, "Disable streaming replies")]
    pub no_stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat controller.
///
/// Everything a request needs besides the session itself lives here; nothing is
/// read from ambient state after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// API token; `None` defers to the `GITHUB_TOKEN` environment variable.
    pub token: Option<String>,

    /// Model for sessions that have none of their own.
    pub default_model: Option<String>,

    /// Organization chat requests are attributed to.
    pub organization: Option<String>,

    /// Stream replies fragment by fragment.
    pub streaming: bool,

    /// Tuning parameters sent with every request.
    pub options: GenerationOptions,

    /// Directory for persisted sessions; `None` keeps them in memory.
    pub store_dir: Option<PathBuf>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: openai/gpt-4o-mini
    /// - Streaming: enabled
    /// - Color: enabled
    /// - Storage: in memory
    pub fn new() -> Self {
        Self {
            token: None,
            default_model: Some(DEFAULT_MODEL.to_string()),
            organization: None,
            streaming: true,
            options: GenerationOptions::default(),
            store_dir: None,
            use_color: true,
        }
    }

    /// Sets the API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets or clears the default model.
    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    /// Sets the organization.
    pub fn with_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    /// Turns streaming on or off.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Replaces the tuning parameters.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the session storage directory.
    pub fn with_store_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.store_dir = dir;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            default_model: Some(args.model.unwrap_or_else(|| DEFAULT_MODEL.to_string())),
            organization: args.organization,
            streaming: !args.no_stream,
            options: GenerationOptions::default().with_max_tokens(args.max_tokens),
            store_dir: args.store_dir.map(PathBuf::from),
            use_color: !args.no_color,
            ..ChatConfig::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.default_model.as_deref(), Some(DEFAULT_MODEL));
        assert!(config.token.is_none());
        assert!(config.organization.is_none());
        assert!(config.streaming);
        assert_eq!(config.options, GenerationOptions::default());
        assert!(config.store_dir.is_none());
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("meta/llama-3.3-70b-instruct".to_string()),
            organization: Some("octo-org".to_string()),
            max_tokens: Some(512),
            store_dir: Some("/tmp/chats".to_string()),
            no_stream: true,
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(
            config.default_model.as_deref(),
            Some("meta/llama-3.3-70b-instruct")
        );
        assert_eq!(config.organization.as_deref(), Some("octo-org"));
        assert_eq!(config.options.max_tokens, Some(512));
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/chats")));
        assert!(!config.streaming);
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_token("t")
            .with_default_model(None)
            .with_organization(Some("org".to_string()))
            .with_streaming(false)
            .with_options(GenerationOptions::new().with_temperature(Some(0.2)))
            .with_store_dir(Some(PathBuf::from("chats")))
            .without_color();
        assert_eq!(config.token.as_deref(), Some("t"));
        assert!(config.default_model.is_none());
        assert_eq!(config.organization.as_deref(), Some("org"));
        assert!(!config.streaming);
        assert_eq!(config.options.temperature, Some(0.2));
        assert_eq!(config.store_dir, Some(PathBuf::from("chats")));
        assert!(!config.use_color);
    }
}
