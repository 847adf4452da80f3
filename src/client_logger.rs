//! Logging trait for client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every request and response passing through the [`GithubModels`] client.
//!
//! [`GithubModels`]: crate::GithubModels

use crate::{ChatCompletion, GenerationRequest};

/// A trait for logging client operations.
///
/// Implement this trait to record API interactions, including buffered
/// completions and the individual fragments of streamed completions.
///
/// # Example
///
/// ```rust,ignore
/// use ghmodels::{ChatCompletion, ClientLogger, GenerationRequest};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &GenerationRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_completion(&self, completion: &ChatCompletion) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Completion: {}", completion.content).unwrap();
///     }
///
///     fn log_fragment(&self, fragment: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Fragment: {fragment}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a chat request just before it is sent.
    fn log_request(&self, request: &GenerationRequest);

    /// Log the result of a buffered `complete` call.
    fn log_completion(&self, completion: &ChatCompletion);

    /// Log one fragment of a streamed completion, in arrival order.
    fn log_fragment(&self, fragment: &str);
}
