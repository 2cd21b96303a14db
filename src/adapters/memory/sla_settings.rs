//! In-memory tenant SLA settings repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::sla::SlaSettings;
use crate::ports::SlaSettingsRepository;

#[derive(Debug, Default)]
pub struct InMemorySlaSettingsRepository {
    settings: RwLock<HashMap<TenantId, SlaSettings>>,
    list_calls: AtomicUsize,
}

impl InMemorySlaSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `list_enabled` reached the store.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlaSettingsRepository for InMemorySlaSettingsRepository {
    async fn save(&self, settings: &SlaSettings) -> Result<(), DomainError> {
        self.settings
            .write()
            .await
            .insert(settings.tenant_id, settings.clone());
        Ok(())
    }

    async fn find(&self, tenant_id: &TenantId) -> Result<Option<SlaSettings>, DomainError> {
        Ok(self.settings.read().await.get(tenant_id).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<SlaSettings>, DomainError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut enabled: Vec<SlaSettings> = self
            .settings
            .read()
            .await
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect();
        enabled.sort_by_key(|s| s.tenant_id);
        Ok(enabled)
    }
}
