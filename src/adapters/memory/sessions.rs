//! In-memory chatbot session repository and message log.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::chatbot::{ChatbotSession, SessionMessage};
use crate::domain::foundation::{ContactId, DomainError, ErrorCode, SessionId, TenantId};
use crate::ports::{ChatbotSessionRepository, SessionMessageLog};

#[derive(Debug, Default)]
pub struct InMemoryChatbotSessionRepository {
    sessions: RwLock<HashMap<SessionId, ChatbotSession>>,
}

impl InMemoryChatbotSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, terminal ones included.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl ChatbotSessionRepository for InMemoryChatbotSessionRepository {
    async fn insert(&self, session: &ChatbotSession) -> Result<(), DomainError> {
        self.sessions
            .write()
            .await
            .insert(*session.id(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &ChatbotSession) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session.id()) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Chatbot session {} not found", session.id()),
            )),
        }
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<ChatbotSession>, DomainError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn find_active(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
        account: &str,
    ) -> Result<Option<ChatbotSession>, DomainError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| {
                s.is_active()
                    && s.tenant_id() == tenant_id
                    && s.contact_id() == contact_id
                    && s.account() == account
            })
            .max_by_key(|s| *s.last_activity_at())
            .cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionMessageLog {
    messages: RwLock<Vec<SessionMessage>>,
}

impl InMemorySessionMessageLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionMessageLog for InMemorySessionMessageLog {
    async fn append(&self, message: &SessionMessage) -> Result<(), DomainError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn list(&self, session_id: &SessionId) -> Result<Vec<SessionMessage>, DomainError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| &m.session_id == session_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chatbot::{Direction, SessionStatus};
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn find_active_skips_terminal_sessions() {
        let repo = InMemoryChatbotSessionRepository::new();
        let (tenant, contact) = (TenantId::new(), ContactId::new());
        let now = Timestamp::now();

        let mut old = ChatbotSession::new(tenant, contact, "main", "+15550100", now);
        old.finish(SessionStatus::Completed, now).unwrap();
        repo.insert(&old).await.unwrap();

        assert!(repo.find_active(&tenant, &contact, "main").await.unwrap().is_none());

        let live = ChatbotSession::new(tenant, contact, "main", "+15550100", now);
        repo.insert(&live).await.unwrap();

        let found = repo.find_active(&tenant, &contact, "main").await.unwrap();
        assert_eq!(found.map(|s| *s.id()), Some(*live.id()));
        assert!(repo.find_active(&tenant, &contact, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_requires_existing_session() {
        let repo = InMemoryChatbotSessionRepository::new();
        let s = ChatbotSession::new(TenantId::new(), ContactId::new(), "main", "1", Timestamp::now());
        let err = repo.update(&s).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn log_keeps_append_order_per_session() {
        let log = InMemorySessionMessageLog::new();
        let (a, b) = (SessionId::new(), SessionId::new());
        let now = Timestamp::now();
        log.append(&SessionMessage::new(a, Direction::Outbound, "1", None, now)).await.unwrap();
        log.append(&SessionMessage::new(b, Direction::Inbound, "x", None, now)).await.unwrap();
        log.append(&SessionMessage::new(a, Direction::Inbound, "2", Some("name"), now)).await.unwrap();

        let bodies: Vec<String> = log.list(&a).await.unwrap().into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, vec!["1", "2"]);
    }
}
