//! Interactive chat application for GitHub Models.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings; the token comes from GITHUB_TOKEN
//! ghmodels-chat
//!
//! # Specify a model and keep chats between runs
//! ghmodels-chat --model meta/llama-3.3-70b-instruct --store-dir ~/.ghmodels
//!
//! # Bill an organization and wait for whole replies
//! ghmodels-chat --organization octo-org --no-stream
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new`, `/list`, `/select <n>` - Manage chats
//! - `/model <id>` - Change the model of the current chat
//! - `/quit` - Exit the application
//!
//! Ctrl+C while a reply is arriving stops it; what arrived so far is kept.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ghmodels::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, PlainTextRenderer, Renderer, SessionRef,
    help_text, parse_command,
};
use ghmodels::{ChatSession, SessionId};

/// Main entry point for the ghmodels-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("ghmodels-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let controller = Arc::new(ChatController::from_config(config)?);
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C while a reply is in flight cancels it. At the prompt rustyline
    // receives the interrupt instead.
    let interrupt = Arc::clone(&controller);
    ctrlc::set_handler(move || {
        interrupt.cancel_all();
    })?;

    let selected = selected_session(&controller);
    println!(
        "GitHub Models Chat (chat: {}, model: {})",
        selected.name,
        describe_model(&controller, &selected)
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if matches!(cmd, ChatCommand::Quit) {
                        println!("Goodbye!");
                        break;
                    }
                    if let Err(err) = run_command(&controller, cmd, &mut renderer).await {
                        renderer.print_error(&err.to_string());
                    }
                    continue;
                }

                let id = controller.store().selected_id();
                let cancel = CancellationToken::new();
                println!("Assistant:");
                match controller.send(&id, line, &cancel, &mut renderer).await {
                    Ok(outcome) if outcome.streamed => {}
                    Ok(outcome) if outcome.cancelled => renderer.print_info("[cancelled]"),
                    Ok(outcome) => renderer.print_reply(&outcome.content),
                    Err(err) => {
                        println!();
                        renderer.print_error(&err.to_string());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

async fn run_command(
    controller: &ChatController,
    cmd: ChatCommand,
    renderer: &mut PlainTextRenderer,
) -> ghmodels::Result<()> {
    let store = controller.store();
    match cmd {
        ChatCommand::New => {
            store.create()?;
            renderer.print_info("Started a new chat.");
        }
        ChatCommand::List => print_sessions(controller),
        ChatCommand::Select(target) => {
            let id = resolve(controller, &target)?;
            store.select(&id)?;
            let session = store.session(&id)?;
            renderer.print_info(&format!("Switched to \"{}\".", session.name));
        }
        ChatCommand::Delete(target) => {
            let id = match target {
                Some(target) => resolve(controller, &target)?,
                None => store.selected_id(),
            };
            let session = store.session(&id)?;
            store.delete(&id)?;
            renderer.print_info(&format!("Deleted \"{}\".", session.name));
        }
        ChatCommand::Rename(name) => {
            store.rename(&store.selected_id(), name.clone())?;
            renderer.print_info(&format!("Chat renamed to \"{name}\"."));
        }
        ChatCommand::Clear => {
            store.clear_turns(&store.selected_id())?;
            renderer.print_info("Conversation cleared.");
        }
        ChatCommand::Model(model) => {
            store.set_model(&store.selected_id(), Some(model.clone()))?;
            renderer.print_info(&format!("Model changed to: {model}"));
        }
        ChatCommand::Models => {
            let models = controller.list_models().await?;
            if models.is_empty() {
                renderer.print_info("No models available.");
            }
            for model in models {
                if model.display_name() == model.id {
                    println!("    {}", model.id);
                } else {
                    println!("    {} ({})", model.id, model.display_name());
                }
            }
        }
        ChatCommand::Temperature(value) => {
            controller.update_config(|c| c.options.temperature = value);
            renderer.print_info(&format!("temperature: {}", describe_float(value)));
        }
        ChatCommand::TopP(value) => {
            controller.update_config(|c| c.options.top_p = value);
            renderer.print_info(&format!("top_p: {}", describe_float(value)));
        }
        ChatCommand::MaxTokens(value) => {
            controller.update_config(|c| c.options.max_tokens = value);
            let shown = value.map_or_else(|| "default".to_string(), |v| v.to_string());
            renderer.print_info(&format!("max_tokens: {shown}"));
        }
        ChatCommand::FrequencyPenalty(value) => {
            controller.update_config(|c| c.options.frequency_penalty = value);
            renderer.print_info(&format!("frequency_penalty: {}", describe_float(value)));
        }
        ChatCommand::PresencePenalty(value) => {
            controller.update_config(|c| c.options.presence_penalty = value);
            renderer.print_info(&format!("presence_penalty: {}", describe_float(value)));
        }
        ChatCommand::Stream(on) => {
            controller.update_config(|c| c.streaming = on);
            renderer.print_info(if on {
                "Streaming enabled."
            } else {
                "Streaming disabled."
            });
        }
        ChatCommand::History => {
            let session = selected_session(controller);
            if session.is_empty() {
                renderer.print_info("No messages yet.");
            }
            for turn in &session.turns {
                println!("    {}: {}", turn.role, turn.content);
            }
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {line}");
            }
        }
        ChatCommand::Quit => {}
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    Ok(())
}

fn selected_session(controller: &ChatController) -> ChatSession {
    controller.store().snapshot().selected().clone()
}

fn resolve(controller: &ChatController, target: &SessionRef) -> ghmodels::Result<SessionId> {
    match target {
        SessionRef::Id(id) => Ok(id.clone()),
        SessionRef::Position(n) => controller
            .store()
            .snapshot()
            .sessions()
            .get(n.wrapping_sub(1))
            .map(|session| session.id.clone())
            .ok_or_else(|| {
                ghmodels::Error::validation(
                    format!("no chat numbered {n}; see /list"),
                    Some("session".to_string()),
                )
            }),
    }
}

fn print_sessions(controller: &ChatController) {
    let snapshot = controller.store().snapshot();
    for (idx, session) in snapshot.sessions().iter().enumerate() {
        let marker = if &session.id == snapshot.selected_id() {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} {}. {} [{} messages, {}]",
            idx + 1,
            session.name,
            session.len(),
            describe_model(controller, session)
        );
    }
}

fn describe_model(controller: &ChatController, session: &ChatSession) -> String {
    session
        .model
        .clone()
        .or(controller.config().default_model)
        .unwrap_or_else(|| "no model".to_string())
}

fn describe_float(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "default".to_string())
}
