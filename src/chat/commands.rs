//! Slash command parsing for the chat application.
//!
//! Input that starts with `/` controls sessions and request settings instead of
//! being sent as a chat message.

use crate::types::SessionId;

/// Largest number treated as a list position rather than a session id.
const MAX_POSITION: usize = 999_999;

/// A session named on the command line, by 1-based list position or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    /// 1-based position in the session list as printed by `/list`.
    Position(usize),
    /// A session identifier.
    Id(SessionId),
}

impl SessionRef {
    fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(n) if n <= MAX_POSITION => SessionRef::Position(n),
            _ => SessionRef::Id(SessionId::from(arg)),
        }
    }
}

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new session and select it.
    New,

    /// List all sessions.
    List,

    /// Select a session.
    Select(SessionRef),

    /// Delete a session; `None` deletes the selected one.
    Delete(Option<SessionRef>),

    /// Rename the selected session.
    Rename(String),

    /// Remove every turn of the selected session.
    Clear,

    /// Set the model of the selected session.
    Model(String),

    /// List models offered by the catalog.
    Models,

    /// Set or clear (`None`) the sampling temperature.
    Temperature(Option<f32>),

    /// Set or clear the top-p value.
    TopP(Option<f32>),

    /// Set or clear the maximum tokens per response.
    MaxTokens(Option<u32>),

    /// Set or clear the frequency penalty.
    FrequencyPenalty(Option<f32>),

    /// Set or clear the presence penalty.
    PresencePenalty(Option<f32>),

    /// Turn streaming on or off.
    Stream(bool),

    /// Print the turns of the selected session.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it should
/// be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use ghmodels::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model openai/gpt-4o-mini").is_some());
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "list" | "ls" => ChatCommand::List,
        "select" | "switch" => match argument {
            Some(arg) => ChatCommand::Select(SessionRef::parse(arg)),
            None => ChatCommand::Invalid("/select requires a number or session id".to_string()),
        },
        "delete" | "rm" => ChatCommand::Delete(argument.map(SessionRef::parse)),
        "rename" => match argument {
            Some(name) => ChatCommand::Rename(name.to_string()),
            None => ChatCommand::Invalid("/rename requires a name".to_string()),
        },
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model id".to_string()),
        },
        "models" => ChatCommand::Models,
        "temperature" => {
            parse_f32_setting(argument, "/temperature", 0.0, 2.0, ChatCommand::Temperature)
        }
        "top_p" => parse_f32_setting(argument, "/top_p", 0.0, 1.0, ChatCommand::TopP),
        "frequency_penalty" => parse_f32_setting(
            argument,
            "/frequency_penalty",
            -2.0,
            2.0,
            ChatCommand::FrequencyPenalty,
        ),
        "presence_penalty" => parse_f32_setting(
            argument,
            "/presence_penalty",
            -2.0,
            2.0,
            ChatCommand::PresencePenalty,
        ),
        "max_tokens" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::MaxTokens(None),
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) if value > 0 => ChatCommand::MaxTokens(Some(value)),
                _ => ChatCommand::Invalid("/max_tokens expects a positive integer".to_string()),
            },
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "stream" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Stream(value),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_f32_setting<F>(
    argument: Option<&str>,
    name: &str,
    min: f32,
    max: f32,
    constructor: F,
) -> ChatCommand
where
    F: Fn(Option<f32>) -> ChatCommand,
{
    match argument {
        Some(arg) if arg.eq_ignore_ascii_case("clear") => constructor(None),
        Some(arg) => match parse_f32_in_range(arg, min, max) {
            Ok(value) => constructor(Some(value)),
            Err(err) => ChatCommand::Invalid(format!("{name} {err}")),
        },
        None => ChatCommand::Invalid(format!("{name} requires a value")),
    }
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                        Start a new chat
  /list                       List chats (the selected one is marked with *)
  /select <n|id>              Switch to a chat by list number or id
  /delete [n|id]              Delete a chat (default: the selected one)
  /rename <name>              Rename the selected chat
  /clear                      Clear the selected chat's history
  /model <id>                 Set the model (e.g., /model openai/gpt-4o-mini)
  /models                     List available models
  /temperature <v>            Set temperature 0-2 (use 'clear' to reset)
  /top_p <v>                  Set top-p 0-1 (use 'clear' to reset)
  /max_tokens <n>             Set maximum response tokens (or 'clear')
  /frequency_penalty <v>      Set frequency penalty -2 to 2 (or 'clear')
  /presence_penalty <v>       Set presence penalty -2 to 2 (or 'clear')
  /stream on|off              Stream replies as they arrive
  /history                    Show the selected chat's messages
  /help                       Show this help message
  /quit                       Exit the chat

Press Ctrl+C while a reply is streaming to stop it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/LIST"), Some(ChatCommand::List));
        assert_eq!(
            parse_command("/select 2"),
            Some(ChatCommand::Select(SessionRef::Position(2)))
        );
        assert_eq!(
            parse_command("/select 1700000000000"),
            Some(ChatCommand::Select(SessionRef::Id(SessionId::from(
                "1700000000000"
            ))))
        );
        assert_eq!(parse_command("/delete"), Some(ChatCommand::Delete(None)));
        assert_eq!(
            parse_command("/delete 3"),
            Some(ChatCommand::Delete(Some(SessionRef::Position(3))))
        );
        assert_eq!(
            parse_command("/rename  Rust questions "),
            Some(ChatCommand::Rename("Rust questions".to_string()))
        );
        assert!(matches!(
            parse_command("/select"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model   openai/gpt-4o-mini  "),
            Some(ChatCommand::Model("openai/gpt-4o-mini".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid("/model requires a model id".to_string()))
        );
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
    }

    #[test]
    fn parse_tuning_settings() {
        assert_eq!(
            parse_command("/temperature 1.5"),
            Some(ChatCommand::Temperature(Some(1.5)))
        );
        assert_eq!(
            parse_command("/temperature clear"),
            Some(ChatCommand::Temperature(None))
        );
        assert!(matches!(
            parse_command("/temperature 3"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("between")
        ));
        assert_eq!(parse_command("/top_p 0.9"), Some(ChatCommand::TopP(Some(0.9))));
        assert_eq!(
            parse_command("/frequency_penalty -1"),
            Some(ChatCommand::FrequencyPenalty(Some(-1.0)))
        );
        assert_eq!(
            parse_command("/presence_penalty clear"),
            Some(ChatCommand::PresencePenalty(None))
        );
        assert_eq!(
            parse_command("/max_tokens 256"),
            Some(ChatCommand::MaxTokens(Some(256)))
        );
        assert!(matches!(
            parse_command("/max_tokens 0"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_stream_toggle() {
        assert_eq!(parse_command("/stream on"), Some(ChatCommand::Stream(true)));
        assert_eq!(parse_command("/stream off"), Some(ChatCommand::Stream(false)));
        assert!(matches!(
            parse_command("/stream maybe"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        for command in ["/new", "/select", "/models", "/stream", "/history", "/quit"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
