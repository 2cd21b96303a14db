//! Chatbot session repository port.
//!
//! Sessions are never deleted during normal operation. Terminal sessions
//! stay in storage as conversation history.

use async_trait::async_trait;

use crate::domain::chatbot::ChatbotSession;
use crate::domain::foundation::{ContactId, DomainError, SessionId, TenantId};

#[async_trait]
pub trait ChatbotSessionRepository: Send + Sync {
    /// Insert a new session.
    async fn insert(&self, session: &ChatbotSession) -> Result<(), DomainError>;

    /// Update an existing session (last write wins).
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    async fn update(&self, session: &ChatbotSession) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<ChatbotSession>, DomainError>;

    /// Most recently active session with status `active` for the triple.
    async fn find_active(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
        account: &str,
    ) -> Result<Option<ChatbotSession>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chatbot_session_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn ChatbotSessionRepository) {}
    }
}
