//! Session repository port.
//!
//! The state machine depends on this capability instead of a process-wide
//! map: get-or-create on first reference, whole-record save with
//! last-writer-wins semantics (the model assumes a single active client per
//! session), and conversation-log appends. The infrastructure layer provides
//! the in-memory implementation.

use std::future::Future;

use slidesmith_types::message::MessageRole;
use slidesmith_types::session::Session;

/// Keyed access to session records.
pub trait SessionRepository: Send + Sync {
    /// Fetch a snapshot of the session, creating it on first reference.
    fn get_or_create(&self, id: &str) -> impl Future<Output = Session> + Send;

    /// Write a whole session record back. Last writer wins; there is no
    /// optimistic concurrency control by design.
    fn save(&self, session: Session) -> impl Future<Output = ()> + Send;

    /// Append one message to the session's conversation log.
    fn append_message(
        &self,
        id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl Future<Output = ()> + Send;

    /// Number of live sessions (diagnostics only).
    fn len(&self) -> impl Future<Output = usize> + Send;
}
