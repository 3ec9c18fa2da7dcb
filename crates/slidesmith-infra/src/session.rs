//! In-memory session repository.
//!
//! Sessions live for the process lifetime in a shared concurrent map; there
//! is no expiry, eviction, or persistence across restarts. Records are
//! replaced wholesale on save (last writer wins), matching the
//! single-active-client-per-session model.

use dashmap::DashMap;

use slidesmith_core::session::SessionRepository;
use slidesmith_types::message::{ChatMessage, MessageRole};
use slidesmith_types::session::Session;

/// DashMap-backed implementation of [`SessionRepository`].
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<String, Session>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemorySessionRepository {
    async fn get_or_create(&self, id: &str) -> Session {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id))
            .clone()
    }

    async fn save(&self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    async fn append_message(&self, id: &str, role: MessageRole, content: &str) {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id))
            .messages
            .push(ChatMessage::now(role, content));
    }

    async fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidesmith_types::session::SessionStage;

    #[tokio::test]
    async fn test_first_reference_creates_session() {
        let repo = MemorySessionRepository::new();
        assert_eq!(repo.len().await, 0);

        let session = repo.get_or_create("s1").await;
        assert_eq!(session.id, "s1");
        assert_eq!(session.stage, SessionStage::Input);
        assert_eq!(repo.len().await, 1);

        // Second reference returns the same record, not a fresh one.
        let again = repo.get_or_create("s1").await;
        assert_eq!(again.id, "s1");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_replaces_whole_record() {
        let repo = MemorySessionRepository::new();
        let mut session = repo.get_or_create("s1").await;
        session.stage = SessionStage::Outline;
        session.user_input = "idea".to_string();
        repo.save(session).await;

        let reloaded = repo.get_or_create("s1").await;
        assert_eq!(reloaded.stage, SessionStage::Outline);
        assert_eq!(reloaded.user_input, "idea");
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let repo = MemorySessionRepository::new();
        let mut first = repo.get_or_create("s1").await;
        let mut second = repo.get_or_create("s1").await;

        first.user_input = "first".to_string();
        second.user_input = "second".to_string();
        repo.save(first).await;
        repo.save(second).await;

        assert_eq!(repo.get_or_create("s1").await.user_input, "second");
    }

    #[tokio::test]
    async fn test_append_message_creates_session_if_needed() {
        let repo = MemorySessionRepository::new();
        repo.append_message("s1", MessageRole::User, "hello").await;

        let session = repo.get_or_create("s1").await;
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "hello");
    }
}
