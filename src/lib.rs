// Public modules
pub mod accumulator;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod decoder;
pub mod error;
pub mod observability;
pub mod persistence;
pub mod render;
pub mod retry;
pub mod store;
pub mod types;

// Re-exports
pub use accumulator::{StreamAccumulator, StreamSummary, send_streaming};
pub use client::{FragmentStream, GithubModels, TOKEN_ENV_VAR};
pub use client_logger::ClientLogger;
pub use decoder::{DONE_SENTINEL, Frame, decode_frames, decode_line};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use persistence::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use render::{PlainTextRenderer, Renderer, StreamObserver};
pub use retry::{DEFAULT_RETRY_BACKOFF, send_with_retry};
pub use store::{STORAGE_KEY, SessionList, SessionStore};
pub use types::*;
