//! Redis pub/sub implementation of Broadcaster.
//!
//! Each tenant has its own channel, `chatflow:tenant:{tenant_id}:events`,
//! carrying JSON-encoded [`TenantEvent`]s. UI gateways subscribe to the
//! channels of the tenants they serve.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId};
use crate::ports::{Broadcaster, TenantEvent};

/// Channel carrying events for `tenant_id`.
pub fn tenant_channel(tenant_id: &TenantId) -> String {
    format!("chatflow:tenant:{}:events", tenant_id)
}

#[derive(Clone)]
pub struct RedisBroadcaster {
    conn: MultiplexedConnection,
}

impl RedisBroadcaster {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Opens a multiplexed connection to `url`.
    ///
    /// # Errors
    ///
    /// - `BroadcastError` if the URL is invalid or Redis is unreachable
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let client = redis::Client::open(url).map_err(broadcast_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(broadcast_error)?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl Broadcaster for RedisBroadcaster {
    async fn broadcast_to_tenant(
        &self,
        tenant_id: &TenantId,
        event_type: &str,
        payload: Value,
    ) -> Result<(), DomainError> {
        let event = TenantEvent::new(*tenant_id, event_type, payload);
        let encoded = serde_json::to_string(&event).map_err(|e| {
            DomainError::new(
                ErrorCode::BroadcastError,
                format!("Failed to encode event: {}", e),
            )
        })?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(tenant_channel(tenant_id), encoded)
            .await
            .map_err(broadcast_error)?;

        tracing::trace!(tenant_id = %tenant_id, event_type, receivers, "Published tenant event");
        Ok(())
    }
}

fn broadcast_error(e: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::BroadcastError, format!("Redis error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_is_scoped_by_tenant() {
        let tenant = TenantId::new();
        assert_eq!(
            tenant_channel(&tenant),
            format!("chatflow:tenant:{}:events", tenant)
        );
    }

    #[test]
    fn envelope_serializes_with_event_type() {
        let event = TenantEvent::new(TenantId::new(), "sla.escalated", serde_json::json!({"level": 1}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "sla.escalated");
        assert_eq!(json["payload"]["level"], 1);
    }
}
