// Public modules
pub mod chat_completion;
pub mod chat_role;
pub mod chat_session;
pub mod chat_turn;
pub mod generation_options;
pub mod generation_request;
pub mod model_catalog;
pub mod model_descriptor;
pub mod session_id;
pub mod stream_chunk;

// Re-exports
pub use chat_completion::{
    ChatCompletion, ChatCompletionResponse, CompletionChoice, CompletionMessage,
};
pub use chat_role::ChatRole;
pub use chat_session::{ChatSession, DEFAULT_SESSION_NAME, auto_name};
pub use chat_turn::ChatTurn;
pub use generation_options::GenerationOptions;
pub use generation_request::GenerationRequest;
pub use model_catalog::ModelCatalog;
pub use model_descriptor::{ModelDescriptor, ModelLimits};
pub use session_id::SessionId;
pub use stream_chunk::{ChunkChoice, ChunkDelta, StreamChunk};
