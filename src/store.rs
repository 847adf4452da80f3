//! Session store.
//!
//! [`SessionList`] is an immutable value: each operation consumes a list and
//! returns the next one. [`SessionStore`] shares the current list between tasks,
//! persists every new list before publishing it, and hands out snapshots, so what a
//! reader sees is always what is on disk.

use std::sync::{Arc, Mutex, MutexGuard};

use time::OffsetDateTime;

use crate::observability::{STORE_MUTATIONS, STORE_PERSIST_ERRORS};
use crate::persistence::{KeyValueStore, MemoryKeyValueStore};
use crate::types::{ChatSession, ChatTurn, SessionId};
use crate::{Error, Result};

/// Key under which the serialized session list is stored.
pub const STORAGE_KEY: &str = "github_chats";

/// An ordered list of chat sessions with one of them selected.
///
/// The list is never empty: deleting the last session creates a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionList {
    sessions: Vec<ChatSession>,
    selected: SessionId,
    last_issued: i128,
}

impl Default for SessionList {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionList {
    /// A list holding one fresh session, selected.
    pub fn new() -> Self {
        Self::from_sessions(Vec::new())
    }

    /// Build a list from previously persisted sessions.
    ///
    /// The first session is selected. An empty input yields one fresh session.
    pub fn from_sessions(sessions: Vec<ChatSession>) -> Self {
        let last_issued = sessions
            .iter()
            .filter_map(|s| s.id.millis())
            .max()
            .unwrap_or(0);
        let mut list = Self {
            sessions,
            selected: SessionId::new(""),
            last_issued,
        };
        match list.sessions.first() {
            Some(first) => list.selected = first.id.clone(),
            None => {
                let id = list.insert_fresh();
                list.selected = id;
            }
        }
        list
    }

    /// All sessions, most recently created first.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Always false; present for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Look up a session by identifier.
    pub fn get(&self, id: &SessionId) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Identifier of the selected session.
    pub fn selected_id(&self) -> &SessionId {
        &self.selected
    }

    /// The selected session.
    pub fn selected(&self) -> &ChatSession {
        // The selected id always names a live session; fall back to the first
        // session rather than panic if that were ever violated.
        self.get(&self.selected).unwrap_or(&self.sessions[0])
    }

    /// Create a session named "New Chat" at the front of the list and select it.
    pub fn create(mut self) -> (Self, SessionId) {
        let id = self.insert_fresh();
        self.selected = id.clone();
        (self, id)
    }

    /// Select an existing session.
    pub fn select(mut self, id: &SessionId) -> Result<Self> {
        self.position(id)?;
        self.selected = id.clone();
        Ok(self)
    }

    /// Delete a session.
    ///
    /// If it was selected, the first remaining session becomes selected. If no
    /// session remains, a fresh one is created and selected.
    pub fn delete(mut self, id: &SessionId) -> Result<Self> {
        let idx = self.position(id)?;
        self.sessions.remove(idx);
        if self.sessions.is_empty() {
            let fresh = self.insert_fresh();
            self.selected = fresh;
        } else if &self.selected == id {
            self.selected = self.sessions[0].id.clone();
        }
        Ok(self)
    }

    /// Append a turn to a session.
    ///
    /// A user turn appended while the session still has its default name also
    /// renames the session after the turn's leading characters.
    pub fn append_turn(mut self, id: &SessionId, turn: ChatTurn) -> Result<Self> {
        self.session_mut(id)?.push_turn(turn);
        Ok(self)
    }

    /// Set or clear the model of a session.
    pub fn set_model(mut self, id: &SessionId, model: Option<String>) -> Result<Self> {
        self.session_mut(id)?.model = model;
        Ok(self)
    }

    /// Replace the content of the session's trailing assistant turn, creating the
    /// turn if the session does not end with one.
    pub fn replace_trailing_assistant(mut self, id: &SessionId, content: String) -> Result<Self> {
        self.session_mut(id)?.replace_trailing_assistant(content);
        Ok(self)
    }

    /// Rename a session.
    pub fn rename(mut self, id: &SessionId, name: impl Into<String>) -> Result<Self> {
        self.session_mut(id)?.name = name.into();
        Ok(self)
    }

    /// Remove every turn of a session, keeping its name and model.
    pub fn clear_turns(mut self, id: &SessionId) -> Result<Self> {
        self.session_mut(id)?.turns.clear();
        Ok(self)
    }

    fn position(&self, id: &SessionId) -> Result<usize> {
        self.sessions
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| unknown_session(id))
    }

    fn session_mut(&mut self, id: &SessionId) -> Result<&mut ChatSession> {
        let idx = self.position(id)?;
        Ok(&mut self.sessions[idx])
    }

    fn insert_fresh(&mut self) -> SessionId {
        let id = self.next_id();
        self.sessions.insert(0, ChatSession::new(id.clone()));
        id
    }

    /// Creation time in milliseconds, bumped past every id issued so far.
    fn next_id(&mut self) -> SessionId {
        let now = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let held = self
            .sessions
            .iter()
            .filter_map(|s| s.id.millis())
            .max()
            .unwrap_or(0);
        let millis = now.max(self.last_issued + 1).max(held + 1);
        self.last_issued = millis;
        SessionId::from_millis(millis)
    }
}

fn unknown_session(id: &SessionId) -> Error {
    Error::not_found(
        "no such chat session",
        Some("session".to_string()),
        Some(id.to_string()),
    )
}

/// Shared, persisted [`SessionList`].
///
/// Every mutation clones the current list, applies one operation, writes the
/// result to the backing [`KeyValueStore`] and only then publishes it. A failed
/// write leaves the published list unchanged.
pub struct SessionStore {
    current: Mutex<Arc<SessionList>>,
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Load the session list stored under [`STORAGE_KEY`].
    ///
    /// A missing or empty list yields one fresh session, which is written back
    /// immediately.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        let sessions: Vec<ChatSession> = match backend.get(STORAGE_KEY)? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|e| {
                Error::serialization(
                    format!("failed to parse stored sessions: {e}"),
                    Some(Box::new(e)),
                )
            })?,
            _ => Vec::new(),
        };
        let loaded = sessions.len();
        let list = SessionList::from_sessions(sessions);
        tracing::debug!(sessions = loaded, "loaded chat sessions");
        let store = Self {
            current: Mutex::new(Arc::new(list)),
            backend,
        };
        if loaded == 0 {
            store.persist(&store.snapshot())?;
        }
        Ok(store)
    }

    /// A store that keeps nothing beyond the process lifetime.
    pub fn in_memory() -> Self {
        Self {
            current: Mutex::new(Arc::new(SessionList::new())),
            backend: Arc::new(MemoryKeyValueStore::new()),
        }
    }

    /// The current list. Later mutations do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<SessionList> {
        Arc::clone(&self.lock())
    }

    /// A copy of one session as it is now.
    pub fn session(&self, id: &SessionId) -> Result<ChatSession> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| unknown_session(id))
    }

    /// Identifier of the selected session.
    pub fn selected_id(&self) -> SessionId {
        self.lock().selected_id().clone()
    }

    /// See [`SessionList::create`].
    pub fn create(&self) -> Result<SessionId> {
        self.mutate(|list| Ok(list.create()))
    }

    /// See [`SessionList::select`].
    pub fn select(&self, id: &SessionId) -> Result<()> {
        self.mutate(|list| Ok((list.select(id)?, ())))
    }

    /// See [`SessionList::delete`].
    pub fn delete(&self, id: &SessionId) -> Result<()> {
        self.mutate(|list| Ok((list.delete(id)?, ())))
    }

    /// See [`SessionList::append_turn`].
    pub fn append_turn(&self, id: &SessionId, turn: ChatTurn) -> Result<()> {
        self.mutate(|list| Ok((list.append_turn(id, turn)?, ())))
    }

    /// See [`SessionList::set_model`].
    pub fn set_model(&self, id: &SessionId, model: Option<String>) -> Result<()> {
        self.mutate(|list| Ok((list.set_model(id, model)?, ())))
    }

    /// See [`SessionList::replace_trailing_assistant`].
    pub fn replace_trailing_assistant(&self, id: &SessionId, content: String) -> Result<()> {
        self.mutate(|list| Ok((list.replace_trailing_assistant(id, content)?, ())))
    }

    /// See [`SessionList::rename`].
    pub fn rename(&self, id: &SessionId, name: impl Into<String>) -> Result<()> {
        self.mutate(|list| Ok((list.rename(id, name)?, ())))
    }

    /// See [`SessionList::clear_turns`].
    pub fn clear_turns(&self, id: &SessionId) -> Result<()> {
        self.mutate(|list| Ok((list.clear_turns(id)?, ())))
    }

    fn mutate<T>(&self, op: impl FnOnce(SessionList) -> Result<(SessionList, T)>) -> Result<T> {
        let mut current = self.lock();
        let (next, out) = op(SessionList::clone(&current))?;
        self.persist(&next)?;
        *current = Arc::new(next);
        STORE_MUTATIONS.click();
        Ok(out)
    }

    fn persist(&self, list: &SessionList) -> Result<()> {
        let raw = serde_json::to_string(list.sessions())?;
        self.backend.set(STORAGE_KEY, &raw).inspect_err(|err| {
            STORE_PERSIST_ERRORS.click();
            tracing::warn!(error = %err, "failed to persist chat sessions");
        })
    }

    fn lock(&self) -> MutexGuard<'_, Arc<SessionList>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
