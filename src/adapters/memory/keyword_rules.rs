//! In-memory keyword rule repository.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, RuleId, TenantId};
use crate::domain::keyword::KeywordRule;
use crate::ports::KeywordRuleRepository;

/// Keyword rules held in a map, for tests and single-process runs.
#[derive(Debug, Default)]
pub struct InMemoryKeywordRuleRepository {
    rules: RwLock<HashMap<RuleId, KeywordRule>>,
}

impl InMemoryKeywordRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeywordRuleRepository for InMemoryKeywordRuleRepository {
    async fn save(&self, rule: &KeywordRule) -> Result<(), DomainError> {
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &RuleId,
    ) -> Result<Option<KeywordRule>, DomainError> {
        Ok(self
            .rules
            .read()
            .await
            .get(id)
            .filter(|r| &r.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_enabled(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Vec<KeywordRule>, DomainError> {
        let mut rules: Vec<KeywordRule> = self
            .rules
            .read()
            .await
            .values()
            .filter(|r| &r.tenant_id == tenant_id && r.account == account && r.enabled)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (Reverse(r.priority), r.created_at, r.id));
        Ok(rules)
    }

    async fn delete(&self, tenant_id: &TenantId, id: &RuleId) -> Result<(), DomainError> {
        let mut rules = self.rules.write().await;
        match rules.get(id) {
            Some(rule) if &rule.tenant_id == tenant_id => {
                rules.remove(id);
                Ok(())
            }
            _ => Err(DomainError::new(
                ErrorCode::RuleNotFound,
                format!("Keyword rule {} not found", id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::keyword::{MatchType, RuleResponse};

    fn rule(tenant: TenantId, account: &str, priority: i32) -> KeywordRule {
        KeywordRule::new(
            tenant,
            account,
            format!("rule-{}", priority),
            vec!["hi".to_string()],
            MatchType::Exact,
            RuleResponse::text("hello"),
        )
        .unwrap()
        .with_priority(priority)
    }

    #[tokio::test]
    async fn list_enabled_filters_and_orders() {
        let repo = InMemoryKeywordRuleRepository::new();
        let tenant = TenantId::new();
        repo.save(&rule(tenant, "main", 1)).await.unwrap();
        repo.save(&rule(tenant, "main", 9)).await.unwrap();
        repo.save(&rule(tenant, "main", 5).disabled()).await.unwrap();
        repo.save(&rule(tenant, "other", 50)).await.unwrap();
        repo.save(&rule(TenantId::new(), "main", 70)).await.unwrap();

        let rules = repo.list_enabled(&tenant, "main").await.unwrap();

        let priorities: Vec<i32> = rules.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![9, 1]);
    }

    #[tokio::test]
    async fn delete_unknown_rule_fails() {
        let repo = InMemoryKeywordRuleRepository::new();
        let err = repo.delete(&TenantId::new(), &RuleId::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RuleNotFound);
    }
}
