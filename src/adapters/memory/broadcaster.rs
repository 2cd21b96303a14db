//! In-process broadcaster with one room per tenant.
//!
//! Each tenant gets a `tokio::sync::broadcast` channel the first time
//! someone subscribes. Events for tenants without listeners are only
//! recorded.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::domain::foundation::{DomainError, TenantId};
use crate::ports::{Broadcaster, TenantEvent};

pub struct InMemoryBroadcaster {
    rooms: RwLock<HashMap<TenantId, broadcast::Sender<TenantEvent>>>,
    history: RwLock<Vec<TenantEvent>>,
    channel_capacity: usize,
}

impl InMemoryBroadcaster {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            channel_capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Receiver for every event broadcast to `tenant_id` from now on.
    pub async fn subscribe(&self, tenant_id: &TenantId) -> broadcast::Receiver<TenantEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(*tenant_id)
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe()
    }

    /// Every event broadcast so far, listeners or not.
    pub async fn events(&self) -> Vec<TenantEvent> {
        self.history.read().await.clone()
    }

    pub async fn events_of_type(&self, event_type: &str) -> Vec<TenantEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryBroadcaster {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl Broadcaster for InMemoryBroadcaster {
    async fn broadcast_to_tenant(
        &self,
        tenant_id: &TenantId,
        event_type: &str,
        payload: Value,
    ) -> Result<(), DomainError> {
        let event = TenantEvent::new(*tenant_id, event_type, payload);
        self.history.write().await.push(event.clone());

        if let Some(sender) = self.rooms.read().await.get(tenant_id) {
            // No receivers left is fine.
            let _ = sender.send(event);
        }
        Ok(())
    }
}
