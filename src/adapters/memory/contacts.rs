//! In-memory contact repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{ContactId, DomainError, ErrorCode, TenantId};
use crate::domain::messaging::Contact;
use crate::ports::ContactRepository;

#[derive(Debug, Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<HashMap<ContactId, Contact>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn save(&self, contact: &Contact) -> Result<(), DomainError> {
        self.contacts
            .write()
            .await
            .insert(contact.id, contact.clone());
        Ok(())
    }

    async fn update(&self, contact: &Contact) -> Result<(), DomainError> {
        let mut contacts = self.contacts.write().await;
        match contacts.get_mut(&contact.id) {
            Some(stored) => {
                *stored = contact.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::ContactNotFound,
                format!("Contact {} not found", contact.id),
            )),
        }
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ContactId,
    ) -> Result<Option<Contact>, DomainError> {
        Ok(self
            .contacts
            .read()
            .await
            .get(id)
            .filter(|c| &c.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_awaiting_reply(&self, tenant_id: &TenantId) -> Result<Vec<Contact>, DomainError> {
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .filter(|c| &c.tenant_id == tenant_id && c.is_awaiting_reply())
            .cloned()
            .collect())
    }
}
