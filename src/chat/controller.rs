//! Chat controller: turns a line of user input into a request and a reply.
//!
//! The controller owns no conversation state of its own. Turns live in the
//! [`SessionStore`]; the controller appends the user turn, resolves the model,
//! builds the request from the session and applies the reply, streamed or not.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::accumulator::send_streaming;
use crate::chat::config::ChatConfig;
use crate::persistence::FileKeyValueStore;
use crate::render::StreamObserver;
use crate::store::SessionStore;
use crate::types::{ChatTurn, GenerationRequest, ModelDescriptor, SessionId};
use crate::{Error, GithubModels, Result};

/// Result of one [`ChatController::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Session the exchange was recorded in.
    pub session_id: SessionId,
    /// Model the request was sent to.
    pub model: String,
    /// The assistant reply; partial if cancelled.
    pub content: String,
    /// True if the request was cancelled before the reply completed.
    pub cancelled: bool,
    /// True if the reply was streamed.
    pub streamed: bool,
}

/// Drives chat exchanges against one client and one session store.
pub struct ChatController {
    client: GithubModels,
    config: Mutex<ChatConfig>,
    store: Arc<SessionStore>,
    in_flight: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl ChatController {
    /// Create a controller from its collaborators.
    pub fn new(client: GithubModels, config: ChatConfig, store: Arc<SessionStore>) -> Self {
        Self {
            client,
            config: Mutex::new(config),
            store,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Build the client and the session store described by `config`.
    ///
    /// Sessions are kept in `config.store_dir` when set, in memory otherwise.
    pub fn from_config(config: ChatConfig) -> Result<Self> {
        let client = GithubModels::new(config.token.clone())?
            .with_organization(config.organization.clone());
        let store = match config.store_dir.as_deref() {
            Some(dir) => open_file_store(dir)?,
            None => SessionStore::in_memory(),
        };
        Ok(Self::new(client, config, Arc::new(store)))
    }

    /// The session store this controller records into.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> ChatConfig {
        self.lock_config().clone()
    }

    /// Change the configuration used by later sends.
    pub fn update_config(&self, update: impl FnOnce(&mut ChatConfig)) {
        update(&mut self.lock_config());
    }

    /// List the models advertised by the catalog.
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        self.client.list_models().await
    }

    /// True if a send is in progress for `session_id`.
    pub fn is_in_flight(&self, session_id: &SessionId) -> bool {
        self.lock_in_flight().contains_key(session_id)
    }

    /// Cancel the in-flight send of one session.
    ///
    /// Returns false if nothing was in flight for that session. Other sessions are
    /// not affected.
    pub fn cancel(&self, session_id: &SessionId) -> bool {
        match self.lock_in_flight().get(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight send.
    pub fn cancel_all(&self) -> usize {
        let in_flight = self.lock_in_flight();
        for token in in_flight.values() {
            token.cancel();
        }
        in_flight.len()
    }

    /// Send `text` as a user turn of `session_id` and record the reply.
    ///
    /// The user turn is persisted before the request goes out. The reply is
    /// streamed into the session when streaming is configured, otherwise it is
    /// appended once complete. Cancelling `cancel`, or calling
    /// [`cancel`](Self::cancel) for this session, stops the request and keeps
    /// whatever part of the reply had already arrived.
    ///
    /// Only one send per session may be in flight; a second one fails with
    /// [`Error::Validation`] without touching the session.
    pub async fn send(
        &self,
        session_id: &SessionId,
        text: &str,
        cancel: &CancellationToken,
        observer: &mut dyn StreamObserver,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation(
                "message is empty",
                Some("text".to_string()),
            ));
        }
        let session = self.store.session(session_id)?;
        let guard = self.begin(session_id, cancel)?;
        let config = self.config();

        let model = match session.model.clone().or(config.default_model.clone()) {
            Some(model) => model,
            None => {
                return Err(Error::validation(
                    "no model selected; choose one with /model",
                    Some("model".to_string()),
                ));
            }
        };
        if session.model.as_deref() != Some(model.as_str()) {
            self.store.set_model(session_id, Some(model.clone()))?;
        }
        self.store.append_turn(session_id, ChatTurn::user(text))?;

        let turns = self.store.session(session_id)?.turns;
        let request =
            GenerationRequest::build(model.clone(), &config.options, &turns, config.streaming);
        tracing::debug!(
            session = %session_id,
            model = %model,
            turns = turns.len(),
            streaming = config.streaming,
            "sending chat request"
        );

        let outcome = if config.streaming {
            let summary = send_streaming(
                &self.client,
                &self.store,
                session_id.clone(),
                &request,
                &guard.token,
                observer,
            )
            .await?;
            SendOutcome {
                session_id: session_id.clone(),
                model,
                content: summary.content,
                cancelled: summary.cancelled,
                streamed: true,
            }
        } else {
            let completion = tokio::select! {
                biased;
                _ = guard.token.cancelled() => None,
                completion = self.client.complete(&request) => Some(completion?),
            };
            match completion {
                Some(completion) => {
                    if !completion.content.is_empty() {
                        self.store.append_turn(
                            session_id,
                            ChatTurn::assistant(completion.content.clone()),
                        )?;
                    }
                    SendOutcome {
                        session_id: session_id.clone(),
                        model,
                        content: completion.content,
                        cancelled: false,
                        streamed: false,
                    }
                }
                None => {
                    tracing::info!(session = %session_id, "request cancelled");
                    SendOutcome {
                        session_id: session_id.clone(),
                        model,
                        content: String::new(),
                        cancelled: true,
                        streamed: false,
                    }
                }
            }
        };
        drop(guard);
        Ok(outcome)
    }

    /// Register an in-flight send for `session_id`.
    fn begin(&self, session_id: &SessionId, cancel: &CancellationToken) -> Result<InFlight<'_>> {
        let mut in_flight = self.lock_in_flight();
        if in_flight.contains_key(session_id) {
            return Err(Error::validation(
                "a reply is already in progress for this chat",
                Some("session".to_string()),
            ));
        }
        let token = cancel.child_token();
        in_flight.insert(session_id.clone(), token.clone());
        Ok(InFlight {
            controller: self,
            session_id: session_id.clone(),
            token,
        })
    }

    fn lock_config(&self) -> MutexGuard<'_, ChatConfig> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<SessionId, CancellationToken>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Deregisters a send when dropped, including when the send future is dropped.
struct InFlight<'a> {
    controller: &'a ChatController,
    session_id: SessionId,
    token: CancellationToken,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.controller.lock_in_flight().remove(&self.session_id);
    }
}

fn open_file_store(dir: &Path) -> Result<SessionStore> {
    let backend = FileKeyValueStore::open(dir)?;
    SessionStore::open(Arc::new(backend))
}
