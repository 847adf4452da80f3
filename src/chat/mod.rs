//! Chat application module for interactive conversations with GitHub Models.
//!
//! This module provides a REPL chat interface built on top of the client
//! library. It supports:
//!
//! - Streaming responses with real-time display and Ctrl+C cancellation
//! - Multiple named chats persisted between runs
//! - Slash commands for session control and tuning parameters
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`controller`]: sending user input and recording replies
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod controller;

pub use crate::render::{PlainTextRenderer, Renderer, StreamObserver};
pub use commands::{ChatCommand, SessionRef, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_MODEL};
pub use controller::{ChatController, SendOutcome};
