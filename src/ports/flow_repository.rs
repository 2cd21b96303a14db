//! Chatbot flow repository port.

use async_trait::async_trait;

use crate::domain::chatbot::ChatbotFlow;
use crate::domain::foundation::{DomainError, FlowId, TenantId};

/// Persistence for chatbot flow definitions and their steps.
#[async_trait]
pub trait FlowRepository: Send + Sync {
    /// Save a flow together with its steps, replacing any previous version.
    async fn save(&self, flow: &ChatbotFlow) -> Result<(), DomainError>;

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &FlowId,
    ) -> Result<Option<ChatbotFlow>, DomainError>;

    /// Enabled flows for a channel account, oldest first.
    async fn list_enabled(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Vec<ChatbotFlow>, DomainError>;
}
