//! Outbound message repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::messaging::OutboundMessage;

#[async_trait]
pub trait OutboundMessageRepository: Send + Sync {
    async fn insert(&self, message: &OutboundMessage) -> Result<(), DomainError>;

    /// Persist a delivery outcome.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if the message doesn't exist
    async fn update(&self, message: &OutboundMessage) -> Result<(), DomainError>;

    /// Messages of a tenant, oldest first.
    async fn list_for_tenant(&self, tenant_id: &TenantId)
        -> Result<Vec<OutboundMessage>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_message_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn OutboundMessageRepository) {}
    }
}
