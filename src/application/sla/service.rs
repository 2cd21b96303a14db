//! SlaService - SLA bookkeeping driven by agent-transfer handlers.

use std::sync::Arc;

use crate::application::cache::SlaSettingsCache;
use crate::domain::foundation::{
    AgentId, ContactId, DomainError, ErrorCode, TenantId, Timestamp, TransferId,
};
use crate::domain::sla::{AgentTransfer, TransferSource};
use crate::ports::TransferRepository;

pub struct SlaService {
    settings: Arc<SlaSettingsCache>,
    transfers: Arc<dyn TransferRepository>,
}

impl SlaService {
    pub fn new(settings: Arc<SlaSettingsCache>, transfers: Arc<dyn TransferRepository>) -> Self {
        Self {
            settings,
            transfers,
        }
    }

    /// Computes the transfer's deadlines from its tenant's settings.
    pub async fn set_sla_deadlines(
        &self,
        transfer: &mut AgentTransfer,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let settings = self.settings.settings_for(&transfer.tenant_id).await?;
        transfer.set_sla_deadlines(settings.as_ref(), now);
        Ok(())
    }

    /// Creates a transfer with its deadlines set and stores it.
    pub async fn open_transfer(
        &self,
        tenant_id: TenantId,
        contact_id: ContactId,
        account: &str,
        phone: &str,
        source: TransferSource,
        now: Timestamp,
    ) -> Result<AgentTransfer, DomainError> {
        let mut transfer = AgentTransfer::new(tenant_id, contact_id, account, phone, source, now);
        self.set_sla_deadlines(&mut transfer, now).await?;
        self.transfers.insert(&transfer).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            transfer_id = %transfer.id,
            source = transfer.source.as_str(),
            "Transfer opened"
        );
        Ok(transfer)
    }

    /// Stamps pick-up and flags a breach if the response deadline had passed.
    pub async fn update_on_pickup(
        &self,
        tenant_id: &TenantId,
        transfer_id: &TransferId,
        agent_id: AgentId,
        now: Timestamp,
    ) -> Result<AgentTransfer, DomainError> {
        let mut transfer = self.load(tenant_id, transfer_id).await?;
        transfer.record_pickup(agent_id, now);
        self.transfers.update(&transfer).await?;

        if transfer.sla.breached {
            tracing::info!(transfer_id = %transfer.id, "Transfer picked up after response deadline");
        }
        Ok(transfer)
    }

    /// Stamps the first agent response once. Returns false when already stamped.
    pub async fn update_on_first_response(
        &self,
        tenant_id: &TenantId,
        transfer_id: &TransferId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut transfer = self.load(tenant_id, transfer_id).await?;
        if !transfer.record_first_response(now) {
            return Ok(false);
        }
        self.transfers.update(&transfer).await?;
        Ok(true)
    }

    /// Records an agent message so a pending escalation is deferred.
    pub async fn record_agent_message(
        &self,
        tenant_id: &TenantId,
        transfer_id: &TransferId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut transfer = self.load(tenant_id, transfer_id).await?;
        transfer.record_agent_message(now);
        transfer.record_first_response(now);
        self.transfers.update(&transfer).await
    }

    async fn load(
        &self,
        tenant_id: &TenantId,
        transfer_id: &TransferId,
    ) -> Result<AgentTransfer, DomainError> {
        self.transfers
            .find_by_id(tenant_id, transfer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::TransferNotFound,
                    format!("Transfer {} not found", transfer_id),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemorySlaSettingsRepository, InMemoryTransferRepository};
    use crate::domain::sla::SlaSettings;
    use crate::ports::SlaSettingsRepository;
    use std::time::Duration;

    struct Fixture {
        settings: Arc<InMemorySlaSettingsRepository>,
        transfers: Arc<InMemoryTransferRepository>,
        service: SlaService,
        tenant: TenantId,
    }

    fn fixture() -> Fixture {
        let settings = Arc::new(InMemorySlaSettingsRepository::new());
        let transfers = Arc::new(InMemoryTransferRepository::new());
        let cache = Arc::new(SlaSettingsCache::new(
            settings.clone(),
            Duration::from_secs(60),
        ));
        Fixture {
            settings,
            transfers: transfers.clone(),
            service: SlaService::new(cache, transfers),
            tenant: TenantId::new(),
        }
    }

    impl Fixture {
        async fn open(&self, now: Timestamp) -> AgentTransfer {
            self.service
                .open_transfer(
                    self.tenant,
                    ContactId::new(),
                    "main",
                    "+15550100",
                    TransferSource::Manual,
                    now,
                )
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn open_transfer_without_settings_has_no_deadlines() {
        let f = fixture();
        let transfer = f.open(Timestamp::now()).await;
        assert!(transfer.sla.response_deadline.is_none());
        assert!(transfer.sla.escalation_at.is_none());
    }

    #[tokio::test]
    async fn response_only_settings_set_only_response_deadline() {
        let f = fixture();
        f.settings
            .save(&SlaSettings::enabled(f.tenant, 15, 0, 0, 0))
            .await
            .unwrap();
        let now = Timestamp::now();

        let transfer = f.open(now).await;

        assert_eq!(transfer.sla.response_deadline, Some(now.plus_minutes(15)));
        assert!(transfer.sla.resolution_deadline.is_none());
        assert!(transfer.sla.escalation_at.is_none());
        assert!(transfer.sla.expires_at.is_none());
    }

    #[tokio::test]
    async fn late_pickup_is_breached_and_stored() {
        let f = fixture();
        f.settings
            .save(&SlaSettings::enabled(f.tenant, 5, 0, 0, 0))
            .await
            .unwrap();
        let now = Timestamp::now();
        let transfer = f.open(now).await;

        let picked = f
            .service
            .update_on_pickup(&f.tenant, &transfer.id, AgentId::new(), now.plus_minutes(6))
            .await
            .unwrap();

        assert!(picked.sla.breached);
        let stored = f
            .transfers
            .find_by_id(&f.tenant, &transfer.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.sla.breached);
        assert!(stored.is_assigned());
    }

    #[tokio::test]
    async fn pickup_at_deadline_is_not_breached() {
        let f = fixture();
        f.settings
            .save(&SlaSettings::enabled(f.tenant, 5, 0, 0, 0))
            .await
            .unwrap();
        let now = Timestamp::now();
        let transfer = f.open(now).await;

        let picked = f
            .service
            .update_on_pickup(&f.tenant, &transfer.id, AgentId::new(), now.plus_minutes(5))
            .await
            .unwrap();

        assert!(!picked.sla.breached);
    }

    #[tokio::test]
    async fn first_response_is_stamped_once() {
        let f = fixture();
        let now = Timestamp::now();
        let transfer = f.open(now).await;

        let first = f
            .service
            .update_on_first_response(&f.tenant, &transfer.id, now.plus_minutes(1))
            .await
            .unwrap();
        let second = f
            .service
            .update_on_first_response(&f.tenant, &transfer.id, now.plus_minutes(2))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let stored = f
            .transfers
            .find_by_id(&f.tenant, &transfer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sla.first_response_at, Some(now.plus_minutes(1)));
    }

    #[tokio::test]
    async fn unknown_transfer_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .update_on_pickup(&f.tenant, &TransferId::new(), AgentId::new(), Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TransferNotFound);
    }
}
