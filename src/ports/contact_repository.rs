//! Contact repository port (chatbot fields only).

use async_trait::async_trait;

use crate::domain::foundation::{ContactId, DomainError, TenantId};
use crate::domain::messaging::Contact;

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn save(&self, contact: &Contact) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `ContactNotFound` if the contact doesn't exist
    async fn update(&self, contact: &Contact) -> Result<(), DomainError>;

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ContactId,
    ) -> Result<Option<Contact>, DomainError>;

    /// Contacts with a chatbot message newer than their last inbound message.
    async fn list_awaiting_reply(&self, tenant_id: &TenantId) -> Result<Vec<Contact>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn ContactRepository) {}
    }
}
