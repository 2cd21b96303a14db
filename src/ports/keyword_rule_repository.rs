//! Keyword rule repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, RuleId, TenantId};
use crate::domain::keyword::KeywordRule;

/// Persistence for keyword auto-reply rules.
#[async_trait]
pub trait KeywordRuleRepository: Send + Sync {
    /// Save a new rule or replace an existing one with the same id.
    async fn save(&self, rule: &KeywordRule) -> Result<(), DomainError>;

    /// Find a rule by id within a tenant.
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &RuleId,
    ) -> Result<Option<KeywordRule>, DomainError>;

    /// Enabled rules for a channel account, highest priority first.
    ///
    /// Rules with equal priority keep a stable order (creation time).
    async fn list_enabled(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Vec<KeywordRule>, DomainError>;

    /// Delete a rule.
    ///
    /// # Errors
    ///
    /// - `RuleNotFound` if the rule doesn't exist
    async fn delete(&self, tenant_id: &TenantId, id: &RuleId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_rule_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn KeywordRuleRepository) {}
    }
}
