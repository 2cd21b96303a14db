//! Broadcaster port - push notifications to a tenant's connected UIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};

/// Envelope delivered to tenant listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantEvent {
    pub tenant_id: TenantId,
    pub event_type: String,
    pub payload: Value,
    pub emitted_at: Timestamp,
}

impl TenantEvent {
    pub fn new(tenant_id: TenantId, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            tenant_id,
            event_type: event_type.into(),
            payload,
            emitted_at: Timestamp::now(),
        }
    }
}

/// Fire-and-forget fan-out to everything listening for a tenant.
///
/// Callers log failures and carry on; nothing in the engine depends on a
/// broadcast being delivered.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_to_tenant(
        &self,
        tenant_id: &TenantId,
        event_type: &str,
        payload: Value,
    ) -> Result<(), DomainError>;
}
