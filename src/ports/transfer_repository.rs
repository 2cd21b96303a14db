//! Agent transfer repository port.

use async_trait::async_trait;

use crate::domain::foundation::{ContactId, DomainError, TenantId, Timestamp, TransferId};
use crate::domain::sla::AgentTransfer;

/// Persistence for agent transfers and their SLA tracking.
///
/// Implementations should index by tenant, status and the deadline columns,
/// which is how the SLA processor reads them on every tick.
#[async_trait]
pub trait TransferRepository: Send + Sync {
    async fn insert(&self, transfer: &AgentTransfer) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `TransferNotFound` if the transfer doesn't exist
    async fn update(&self, transfer: &AgentTransfer) -> Result<(), DomainError>;

    /// Writes only the escalation markers of an active transfer: level,
    /// `escalated_at`, `escalation_at`, `last_checked_at` and the breach flag.
    /// Assignment and agent activity are left as stored.
    ///
    /// Returns false if the transfer is missing or no longer active.
    async fn record_escalation(&self, transfer: &AgentTransfer) -> Result<bool, DomainError>;

    /// Moves an active transfer to expired and stamps `ended_at`.
    ///
    /// Returns false if the transfer is missing or no longer active.
    async fn expire(
        &self,
        tenant_id: &TenantId,
        id: &TransferId,
        ended_at: &Timestamp,
    ) -> Result<bool, DomainError>;

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &TransferId,
    ) -> Result<Option<AgentTransfer>, DomainError>;

    /// Active transfers whose `expires_at` is at or before `now`.
    async fn list_expired(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<Vec<AgentTransfer>, DomainError>;

    /// Active transfers below the critical level whose `escalation_at` is at or before `now`.
    async fn list_due_for_escalation(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<Vec<AgentTransfer>, DomainError>;

    /// Flags every active, unassigned, unflagged transfer whose response
    /// deadline has passed, in one statement. Returns the number flagged.
    async fn mark_breached_unassigned(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<u64, DomainError>;

    async fn has_active_for_contact(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
    ) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn TransferRepository) {}
    }
}
