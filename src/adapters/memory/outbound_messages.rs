//! In-memory outbound message repository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId};
use crate::domain::messaging::OutboundMessage;
use crate::ports::OutboundMessageRepository;

#[derive(Debug, Default)]
pub struct InMemoryOutboundMessageRepository {
    messages: RwLock<Vec<OutboundMessage>>,
}

impl InMemoryOutboundMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<OutboundMessage> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl OutboundMessageRepository for InMemoryOutboundMessageRepository {
    async fn insert(&self, message: &OutboundMessage) -> Result<(), DomainError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn update(&self, message: &OutboundMessage) -> Result<(), DomainError> {
        let mut messages = self.messages.write().await;
        match messages.iter_mut().find(|m| m.id == message.id) {
            Some(stored) => {
                *stored = message.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::MessageNotFound,
                format!("Outbound message {} not found", message.id),
            )),
        }
    }

    async fn list_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<OutboundMessage>, DomainError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| &m.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}
