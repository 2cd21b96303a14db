//! In-memory agent transfer repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{ContactId, DomainError, ErrorCode, TenantId, Timestamp, TransferId};
use crate::domain::sla::AgentTransfer;
use crate::ports::TransferRepository;

#[derive(Debug, Default)]
pub struct InMemoryTransferRepository {
    transfers: RwLock<HashMap<TransferId, AgentTransfer>>,
}

impl InMemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, tenant_id: &TenantId, keep: F) -> Vec<AgentTransfer>
    where
        F: Fn(&AgentTransfer) -> bool,
    {
        let mut found: Vec<AgentTransfer> = self
            .transfers
            .read()
            .await
            .values()
            .filter(|t| &t.tenant_id == tenant_id && keep(t))
            .cloned()
            .collect();
        found.sort_by_key(|t| (t.transferred_at, t.id));
        found
    }
}

#[async_trait]
impl TransferRepository for InMemoryTransferRepository {
    async fn insert(&self, transfer: &AgentTransfer) -> Result<(), DomainError> {
        self.transfers
            .write()
            .await
            .insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn update(&self, transfer: &AgentTransfer) -> Result<(), DomainError> {
        let mut transfers = self.transfers.write().await;
        match transfers.get_mut(&transfer.id) {
            Some(stored) => {
                *stored = transfer.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::TransferNotFound,
                format!("Transfer {} not found", transfer.id),
            )),
        }
    }

    async fn record_escalation(&self, transfer: &AgentTransfer) -> Result<bool, DomainError> {
        let mut transfers = self.transfers.write().await;
        let Some(stored) = transfers.get_mut(&transfer.id).filter(|t| t.is_active()) else {
            return Ok(false);
        };
        stored.sla.escalation_level = transfer.sla.escalation_level;
        stored.sla.escalated_at = transfer.sla.escalated_at;
        stored.sla.escalation_at = transfer.sla.escalation_at;
        stored.sla.last_checked_at = transfer.sla.last_checked_at;
        if transfer.sla.breached && !stored.sla.breached {
            stored.sla.breached = true;
            stored.sla.breached_at = transfer.sla.breached_at;
        }
        Ok(true)
    }

    async fn expire(
        &self,
        tenant_id: &TenantId,
        id: &TransferId,
        ended_at: &Timestamp,
    ) -> Result<bool, DomainError> {
        let mut transfers = self.transfers.write().await;
        Ok(transfers
            .get_mut(id)
            .filter(|t| &t.tenant_id == tenant_id)
            .is_some_and(|stored| stored.expire(*ended_at).is_ok()))
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &TransferId,
    ) -> Result<Option<AgentTransfer>, DomainError> {
        Ok(self
            .transfers
            .read()
            .await
            .get(id)
            .filter(|t| &t.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_expired(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<Vec<AgentTransfer>, DomainError> {
        Ok(self.select(tenant_id, |t| t.is_expiry_due(now)).await)
    }

    async fn list_due_for_escalation(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<Vec<AgentTransfer>, DomainError> {
        Ok(self.select(tenant_id, |t| t.is_escalation_due(now)).await)
    }

    async fn mark_breached_unassigned(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<u64, DomainError> {
        let mut flagged = 0;
        for transfer in self.transfers.write().await.values_mut() {
            if &transfer.tenant_id == tenant_id && transfer.is_breach_due(now) {
                transfer.mark_breached(*now);
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    async fn has_active_for_contact(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
    ) -> Result<bool, DomainError> {
        Ok(self
            .transfers
            .read()
            .await
            .values()
            .any(|t| &t.tenant_id == tenant_id && &t.contact_id == contact_id && t.is_active()))
    }
}
