//! In-memory chatbot flow repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::chatbot::ChatbotFlow;
use crate::domain::foundation::{DomainError, FlowId, TenantId};
use crate::ports::FlowRepository;

#[derive(Debug, Default)]
pub struct InMemoryFlowRepository {
    flows: RwLock<HashMap<FlowId, ChatbotFlow>>,
}

impl InMemoryFlowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowRepository for InMemoryFlowRepository {
    async fn save(&self, flow: &ChatbotFlow) -> Result<(), DomainError> {
        self.flows.write().await.insert(flow.id, flow.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &FlowId,
    ) -> Result<Option<ChatbotFlow>, DomainError> {
        Ok(self
            .flows
            .read()
            .await
            .get(id)
            .filter(|f| &f.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_enabled(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Vec<ChatbotFlow>, DomainError> {
        let mut flows: Vec<ChatbotFlow> = self
            .flows
            .read()
            .await
            .values()
            .filter(|f| &f.tenant_id == tenant_id && f.account == account && f.enabled)
            .cloned()
            .collect();
        flows.sort_by_key(|f| (f.created_at, f.id));
        Ok(flows)
    }
}
