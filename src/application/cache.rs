//! Explicit read-through caches for tenant configuration.
//!
//! Keyword rules, flows and SLA settings are read on every inbound message
//! and every processor tick. These caches keep them for a bounded time and
//! expose `invalidate` hooks for the code paths that mutate them.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::chatbot::ChatbotFlow;
use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::keyword::RuleSet;
use crate::domain::sla::SlaSettings;
use crate::ports::{FlowRepository, KeywordRuleRepository, SlaSettingsRepository};

/// A map whose entries expire `ttl` after insertion.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The cached value, if present and not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        self.entries
            .write()
            .await
            .insert(key, (Instant::now(), value));
    }

    /// Returns the cached value or loads, stores and returns a fresh one.
    ///
    /// Load errors are returned and nothing is cached.
    pub async fn get_or_try_load<F, Fut>(&self, key: K, load: F) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        let value = load().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }
}

type AccountKey = (TenantId, String);

/// Keyword rules and flows per (tenant, account).
pub struct RuleCache {
    rule_repository: Arc<dyn KeywordRuleRepository>,
    flow_repository: Arc<dyn FlowRepository>,
    rules: TtlCache<AccountKey, Arc<RuleSet>>,
    flows: TtlCache<AccountKey, Arc<Vec<ChatbotFlow>>>,
}

impl RuleCache {
    pub fn new(
        rule_repository: Arc<dyn KeywordRuleRepository>,
        flow_repository: Arc<dyn FlowRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            rule_repository,
            flow_repository,
            rules: TtlCache::new(ttl),
            flows: TtlCache::new(ttl),
        }
    }

    /// Enabled rules for the account as a compiled [`RuleSet`].
    ///
    /// The set is built once per load, so regex keywords are compiled at
    /// most once per TTL window.
    pub async fn rules(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Arc<RuleSet>, DomainError> {
        self.rules
            .get_or_try_load((*tenant_id, account.to_string()), || async {
                let rules = self.rule_repository.list_enabled(tenant_id, account).await?;
                Ok(Arc::new(RuleSet::new(rules)))
            })
            .await
    }

    /// Enabled flows for the account.
    pub async fn flows(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Arc<Vec<ChatbotFlow>>, DomainError> {
        self.flows
            .get_or_try_load((*tenant_id, account.to_string()), || async {
                let flows = self.flow_repository.list_enabled(tenant_id, account).await?;
                Ok(Arc::new(flows))
            })
            .await
    }

    /// Drops cached rules and flows of one account after a mutation.
    pub async fn invalidate(&self, tenant_id: &TenantId, account: &str) {
        let key = (*tenant_id, account.to_string());
        self.rules.invalidate(&key).await;
        self.flows.invalidate(&key).await;
    }

    pub async fn invalidate_all(&self) {
        self.rules.invalidate_all().await;
        self.flows.invalidate_all().await;
    }
}

/// Tenant SLA settings, individually and as the enabled set.
pub struct SlaSettingsCache {
    repository: Arc<dyn SlaSettingsRepository>,
    enabled: TtlCache<(), Arc<Vec<SlaSettings>>>,
    by_tenant: TtlCache<TenantId, Option<SlaSettings>>,
}

impl SlaSettingsCache {
    pub fn new(repository: Arc<dyn SlaSettingsRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            enabled: TtlCache::new(ttl),
            by_tenant: TtlCache::new(ttl),
        }
    }

    /// Settings of every tenant with SLA tracking enabled.
    pub async fn enabled_tenants(&self) -> Result<Arc<Vec<SlaSettings>>, DomainError> {
        self.enabled
            .get_or_try_load((), || async {
                Ok(Arc::new(self.repository.list_enabled().await?))
            })
            .await
    }

    pub async fn settings_for(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<SlaSettings>, DomainError> {
        self.by_tenant
            .get_or_try_load(*tenant_id, || self.repository.find(tenant_id))
            .await
    }

    /// Drops everything cached for `tenant_id`, including the enabled set.
    pub async fn invalidate(&self, tenant_id: &TenantId) {
        self.by_tenant.invalidate(tenant_id).await;
        self.enabled.invalidate(&()).await;
    }
}
