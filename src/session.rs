//! In-memory, per-session conversation history.
//!
//! Sessions are created lazily and live until [`SessionStore::delete`] or
//! process exit. Each log sits behind its own async mutex: the orchestrator
//! holds it for a whole exchange, so calls on one session id run one at a
//! time while different sessions proceed concurrently.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only message log of one session.
#[derive(Debug, Default)]
pub struct SessionLog {
    messages: Vec<Message>,
}

impl SessionLog {
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub type SessionHandle = Arc<Mutex<SessionLog>>;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the session's log, allocating an empty one on first use.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %session_id, "session created");
                SessionHandle::default()
            });
        Arc::clone(entry.value())
    }

    pub async fn append(&self, session_id: &str, role: Role, content: impl Into<String>) {
        let handle = self.get_or_create(session_id);
        handle.lock().await.push(Message {
            role,
            content: content.into(),
        });
    }

    /// Copy of the session's messages in append order. Empty for unknown sessions.
    pub async fn snapshot(&self, session_id: &str) -> Vec<Message> {
        let Some(handle) = self.sessions.get(session_id).map(|e| Arc::clone(e.value())) else {
            return Vec::new();
        };
        let log = handle.lock().await;
        log.messages().to_vec()
    }

    /// Drop the session's log. No-op when the session does not exist.
    ///
    /// An exchange already in flight on this session finishes against the
    /// detached log; its turns are not visible to later calls.
    pub fn delete(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            tracing::debug!(session_id = %session_id, "session cleared");
        }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_created_lazily() {
        let store = SessionStore::new();
        assert!(!store.contains("s1"));
        assert!(store.snapshot("s1").await.is_empty());
        assert!(!store.contains("s1"), "snapshot must not create a session");

        store.get_or_create("s1");
        assert!(store.contains("s1"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let store = SessionStore::new();
        store.append("s1", Role::User, "What is a limit?").await;
        store.append("s1", Role::Assistant, "A value a function approaches.").await;

        let messages = store.snapshot("s1").await;
        assert_eq!(
            messages,
            vec![
                Message::user("What is a limit?"),
                Message::assistant("A value a function approaches."),
            ]
        );
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new();
        store.append("a", Role::User, "only in a").await;
        store.append("b", Role::User, "only in b").await;

        assert_eq!(store.snapshot("a").await, vec![Message::user("only in a")]);
        assert_eq!(store.snapshot("b").await, vec![Message::user("only in b")]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = SessionStore::new();
        store.append("s1", Role::User, "hello").await;

        store.delete("s1");
        store.delete("s1");
        store.delete("never-existed");

        assert!(!store.contains("s1"));
        assert!(store.snapshot("s1").await.is_empty());
    }

    #[tokio::test]
    async fn handle_shares_the_same_log() {
        let store = SessionStore::new();
        let handle = store.get_or_create("s1");
        handle.lock().await.push(Message::user("via handle"));

        assert_eq!(store.snapshot("s1").await.len(), 1);
        assert!(Arc::ptr_eq(&handle, &store.get_or_create("s1")));
    }
}
