//! Append-only session message log port.

use async_trait::async_trait;

use crate::domain::chatbot::SessionMessage;
use crate::domain::foundation::{DomainError, SessionId};

#[async_trait]
pub trait SessionMessageLog: Send + Sync {
    async fn append(&self, message: &SessionMessage) -> Result<(), DomainError>;

    /// Messages of a session in the order they were appended.
    async fn list(&self, session_id: &SessionId) -> Result<Vec<SessionMessage>, DomainError>;
}
