//! PostgreSQL implementation of KeywordRuleRepository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, FlowId, RuleId, TenantId};
use crate::domain::keyword::{ActiveWindow, KeywordRule, RuleResponse};
use crate::ports::KeywordRuleRepository;

use super::support::{column, optional_datetime, optional_timestamp, parse_column, timestamp};

const SELECT_RULE: &str = r#"
    SELECT id, tenant_id, account, name, keywords, match_type, case_sensitive,
           priority, enabled, starts_at, ends_at, response_kind, response_body,
           buttons, media_url, flow_id, created_at, updated_at
    FROM keyword_rules
"#;

#[derive(Clone)]
pub struct PostgresKeywordRuleRepository {
    pool: PgPool,
}

impl PostgresKeywordRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeywordRuleRepository for PostgresKeywordRuleRepository {
    async fn save(&self, rule: &KeywordRule) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO keyword_rules (
                id, tenant_id, account, name, keywords, match_type, case_sensitive,
                priority, enabled, starts_at, ends_at, response_kind, response_body,
                buttons, media_url, flow_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (id) DO UPDATE SET
                account = EXCLUDED.account,
                name = EXCLUDED.name,
                keywords = EXCLUDED.keywords,
                match_type = EXCLUDED.match_type,
                case_sensitive = EXCLUDED.case_sensitive,
                priority = EXCLUDED.priority,
                enabled = EXCLUDED.enabled,
                starts_at = EXCLUDED.starts_at,
                ends_at = EXCLUDED.ends_at,
                response_kind = EXCLUDED.response_kind,
                response_body = EXCLUDED.response_body,
                buttons = EXCLUDED.buttons,
                media_url = EXCLUDED.media_url,
                flow_id = EXCLUDED.flow_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(rule.id.as_uuid())
        .bind(rule.tenant_id.as_uuid())
        .bind(&rule.account)
        .bind(&rule.name)
        .bind(&rule.keywords)
        .bind(rule.match_type.as_str())
        .bind(rule.case_sensitive)
        .bind(rule.priority)
        .bind(rule.enabled)
        .bind(optional_datetime(rule.active_window.starts_at.as_ref()))
        .bind(optional_datetime(rule.active_window.ends_at.as_ref()))
        .bind(rule.response.kind.as_str())
        .bind(&rule.response.body)
        .bind(Json(&rule.response.buttons))
        .bind(&rule.response.media_url)
        .bind(rule.response.flow_id.map(|id| *id.as_uuid()))
        .bind(rule.created_at.as_datetime())
        .bind(rule.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save keyword rule", e))?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &RuleId,
    ) -> Result<Option<KeywordRule>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE tenant_id = $1 AND id = $2", SELECT_RULE))
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch keyword rule", e))?;

        row.as_ref().map(row_to_rule).transpose()
    }

    async fn list_enabled(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Vec<KeywordRule>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE tenant_id = $1 AND account = $2 AND enabled \
             ORDER BY priority DESC, created_at, id",
            SELECT_RULE
        ))
        .bind(tenant_id.as_uuid())
        .bind(account)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list keyword rules", e))?;

        rows.iter().map(row_to_rule).collect()
    }

    async fn delete(&self, tenant_id: &TenantId, id: &RuleId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM keyword_rules WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to delete keyword rule", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::RuleNotFound,
                format!("Keyword rule not found: {}", id),
            ));
        }
        Ok(())
    }
}

fn row_to_rule(row: &PgRow) -> Result<KeywordRule, DomainError> {
    let buttons: Json<Vec<String>> = column(row, "buttons")?;
    let flow_id: Option<uuid::Uuid> = column(row, "flow_id")?;

    Ok(KeywordRule {
        id: RuleId::from_uuid(column(row, "id")?),
        tenant_id: TenantId::from_uuid(column(row, "tenant_id")?),
        account: column(row, "account")?,
        name: column(row, "name")?,
        keywords: column(row, "keywords")?,
        match_type: parse_column(row, "match_type")?,
        case_sensitive: column(row, "case_sensitive")?,
        priority: column(row, "priority")?,
        enabled: column(row, "enabled")?,
        active_window: ActiveWindow {
            starts_at: optional_timestamp(row, "starts_at")?,
            ends_at: optional_timestamp(row, "ends_at")?,
        },
        response: RuleResponse {
            kind: parse_column(row, "response_kind")?,
            body: column(row, "response_body")?,
            buttons: buttons.0,
            media_url: column(row, "media_url")?,
            flow_id: flow_id.map(FlowId::from_uuid),
        },
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}
