//! Tenant SLA settings repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::sla::SlaSettings;

#[async_trait]
pub trait SlaSettingsRepository: Send + Sync {
    /// Insert or replace the settings of a tenant.
    async fn save(&self, settings: &SlaSettings) -> Result<(), DomainError>;

    async fn find(&self, tenant_id: &TenantId) -> Result<Option<SlaSettings>, DomainError>;

    /// Settings of every tenant with SLA tracking enabled.
    async fn list_enabled(&self) -> Result<Vec<SlaSettings>, DomainError>;
}
