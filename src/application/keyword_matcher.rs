//! Keyword and flow-trigger matching for inbound messages.

use serde_json::Value;
use std::sync::Arc;

use crate::domain::chatbot::{find_triggered_flow, ChatbotFlow};
use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::keyword::MatchedResponse;
use crate::domain::template::{render, Vars};

use super::cache::RuleCache;

/// Selects the automated response or flow for an inbound text.
pub struct KeywordMatcher {
    cache: Arc<RuleCache>,
}

impl KeywordMatcher {
    pub fn new(cache: Arc<RuleCache>) -> Self {
        Self { cache }
    }

    /// Highest-priority live rule matching `text`, with its response rendered.
    ///
    /// `None` means no rule matched.
    pub async fn match_keyword(
        &self,
        tenant_id: &TenantId,
        account: &str,
        text: &str,
    ) -> Result<Option<MatchedResponse>, DomainError> {
        self.match_at(tenant_id, account, text, &Timestamp::now()).await
    }

    /// [`match_keyword`](Self::match_keyword) evaluated at `now`.
    pub async fn match_at(
        &self,
        tenant_id: &TenantId,
        account: &str,
        text: &str,
        now: &Timestamp,
    ) -> Result<Option<MatchedResponse>, DomainError> {
        let rules = self.cache.rules(tenant_id, account).await?;
        let Some(rule) = rules.select(text, now) else {
            tracing::trace!(tenant_id = %tenant_id, account, "No keyword rule matched");
            return Ok(None);
        };

        tracing::debug!(tenant_id = %tenant_id, rule_id = %rule.id, rule = %rule.name, "Keyword rule matched");

        let mut vars = Vars::new();
        vars.insert("message".to_string(), Value::String(text.to_string()));

        Ok(Some(MatchedResponse {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            kind: rule.response.kind,
            body: render(&rule.response.body, &vars),
            buttons: rule
                .response
                .buttons
                .iter()
                .map(|button| render(button, &vars))
                .collect(),
            media_url: rule.response.media_url.clone(),
            flow_id: rule.response.flow_id,
        }))
    }

    /// First enabled flow whose trigger keywords contain `text`, ignoring case.
    pub async fn match_flow_trigger(
        &self,
        tenant_id: &TenantId,
        account: &str,
        text: &str,
    ) -> Result<Option<ChatbotFlow>, DomainError> {
        let flows = self.cache.flows(tenant_id, account).await?;
        Ok(find_triggered_flow(&flows, text).cloned())
    }
}
