//! In-memory chat sessions.
//!
//! A session is an ordered, append-only message sequence scoped to one chat
//! surface. Sessions are not persisted; a reset clears the messages, a
//! restart clears everything.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use reportsage_chat::ChatMessage;

/// One chat session with its accumulated history.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub messages: Vec<ChatMessage>,
}

/// Listing entry for a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "messageCount")]
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Thread-safe store of live chat sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get an existing session's id, or create a fresh one.
    ///
    /// An unknown provided id is recreated under the same id so clients
    /// survive a server restart without losing their handle.
    pub fn get_or_create(&self, id: Option<&str>) -> String {
        let id = id
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut sessions = self.sessions.write();
        sessions.entry(id.clone()).or_insert_with(|| ChatSession {
            id: id.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            messages: Vec::new(),
        });
        id
    }

    /// Snapshot a session.
    pub fn get(&self, id: &str) -> Option<ChatSession> {
        self.sessions.read().get(id).cloned()
    }

    /// Snapshot a session's message history.
    pub fn history(&self, id: &str) -> Vec<ChatMessage> {
        self.sessions
            .read()
            .get(id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Append a message to a session. Returns false for unknown sessions.
    pub fn append(&self, id: &str, message: ChatMessage) -> bool {
        match self.sessions.write().get_mut(id) {
            Some(session) => {
                session.messages.push(message);
                true
            }
            None => false,
        }
    }

    /// Clear a session's messages, keeping the session itself.
    pub fn reset(&self, id: &str) -> bool {
        match self.sessions.write().get_mut(id) {
            Some(session) => {
                session.messages.clear();
                true
            }
            None => false,
        }
    }

    /// Remove a session entirely.
    pub fn delete(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    /// List session summaries, newest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read();
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .map(|s| SessionSummary {
                id: s.id.clone(),
                created_at: s.created_at.clone(),
                message_count: s.messages.len(),
                preview: s
                    .messages
                    .first()
                    .map(|m| reportsage_chat::answer::text_preview(&m.content, 80)),
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_generates_and_reuses_ids() {
        let store = SessionStore::new();

        let id = store.get_or_create(None);
        assert!(store.get(&id).is_some());

        let same = store.get_or_create(Some(&id));
        assert_eq!(same, id);

        // Unknown provided id is recreated under that id
        let provided = store.get_or_create(Some("client-chosen"));
        assert_eq!(provided, "client-chosen");
        assert!(store.get("client-chosen").is_some());
    }

    #[test]
    fn test_messages_are_append_only_ordered() {
        let store = SessionStore::new();
        let id = store.get_or_create(None);

        assert!(store.append(&id, ChatMessage::user("first question")));
        assert!(store.append(&id, ChatMessage::assistant("first answer")));
        assert!(store.append(&id, ChatMessage::user("second question")));

        let history = store.history(&id);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "first question");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[2].content, "second question");
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let store = SessionStore::new();
        assert!(!store.append("missing", ChatMessage::user("hello")));
    }

    #[test]
    fn test_reset_clears_messages_but_keeps_session() {
        let store = SessionStore::new();
        let id = store.get_or_create(None);
        store.append(&id, ChatMessage::user("to be cleared"));

        assert!(store.reset(&id));
        assert!(store.get(&id).is_some());
        assert!(store.history(&id).is_empty());
    }

    #[test]
    fn test_delete_removes_session() {
        let store = SessionStore::new();
        let id = store.get_or_create(None);

        assert!(store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.delete(&id));
    }

    #[test]
    fn test_list_summaries_carry_preview_and_count() {
        let store = SessionStore::new();
        let id = store.get_or_create(None);
        store.append(&id, ChatMessage::user("What was the revenue this year?"));
        store.append(&id, ChatMessage::assistant("Revenue grew 36%."));

        let summaries = store.list();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(
            summaries[0].preview.as_deref(),
            Some("What was the revenue this year?")
        );
    }
}
