//! PostgreSQL implementation of FlowRepository.
//!
//! Steps are stored as a JSONB array on the flow row.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::chatbot::{ChatbotFlow, FlowStep};
use crate::domain::foundation::{DomainError, FlowId, TenantId};
use crate::ports::FlowRepository;

use super::support::{column, timestamp};

const SELECT_FLOW: &str = r#"
    SELECT id, tenant_id, account, name, trigger_keywords, steps, completion_message,
           cancel_keywords, cancel_message, timeout_message, enabled, created_at, updated_at
    FROM chatbot_flows
"#;

#[derive(Clone)]
pub struct PostgresFlowRepository {
    pool: PgPool,
}

impl PostgresFlowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlowRepository for PostgresFlowRepository {
    async fn save(&self, flow: &ChatbotFlow) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chatbot_flows (
                id, tenant_id, account, name, trigger_keywords, steps, completion_message,
                cancel_keywords, cancel_message, timeout_message, enabled, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                account = EXCLUDED.account,
                name = EXCLUDED.name,
                trigger_keywords = EXCLUDED.trigger_keywords,
                steps = EXCLUDED.steps,
                completion_message = EXCLUDED.completion_message,
                cancel_keywords = EXCLUDED.cancel_keywords,
                cancel_message = EXCLUDED.cancel_message,
                timeout_message = EXCLUDED.timeout_message,
                enabled = EXCLUDED.enabled,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(flow.id.as_uuid())
        .bind(flow.tenant_id.as_uuid())
        .bind(&flow.account)
        .bind(&flow.name)
        .bind(&flow.trigger_keywords)
        .bind(Json(&flow.steps))
        .bind(&flow.completion_message)
        .bind(&flow.cancel_keywords)
        .bind(&flow.cancel_message)
        .bind(&flow.timeout_message)
        .bind(flow.enabled)
        .bind(flow.created_at.as_datetime())
        .bind(flow.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save chatbot flow", e))?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &FlowId,
    ) -> Result<Option<ChatbotFlow>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE tenant_id = $1 AND id = $2", SELECT_FLOW))
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch chatbot flow", e))?;

        row.as_ref().map(row_to_flow).transpose()
    }

    async fn list_enabled(
        &self,
        tenant_id: &TenantId,
        account: &str,
    ) -> Result<Vec<ChatbotFlow>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE tenant_id = $1 AND account = $2 AND enabled ORDER BY created_at, id",
            SELECT_FLOW
        ))
        .bind(tenant_id.as_uuid())
        .bind(account)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list chatbot flows", e))?;

        rows.iter().map(row_to_flow).collect()
    }
}

fn row_to_flow(row: &PgRow) -> Result<ChatbotFlow, DomainError> {
    let Json(mut steps): Json<Vec<FlowStep>> = column(row, "steps")?;
    steps.sort_by_key(|s| s.order);

    Ok(ChatbotFlow {
        id: FlowId::from_uuid(column(row, "id")?),
        tenant_id: TenantId::from_uuid(column(row, "tenant_id")?),
        account: column(row, "account")?,
        name: column(row, "name")?,
        trigger_keywords: column(row, "trigger_keywords")?,
        steps,
        completion_message: column(row, "completion_message")?,
        cancel_keywords: column(row, "cancel_keywords")?,
        cancel_message: column(row, "cancel_message")?,
        timeout_message: column(row, "timeout_message")?,
        enabled: column(row, "enabled")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}
