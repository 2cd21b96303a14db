//! PostgreSQL implementation of OutboundMessageRepository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{ContactId, DomainError, ErrorCode, MessageId, TenantId};
use crate::domain::messaging::OutboundMessage;
use crate::ports::OutboundMessageRepository;

use super::support::{column, parse_column, timestamp};

#[derive(Clone)]
pub struct PostgresOutboundMessageRepository {
    pool: PgPool,
}

impl PostgresOutboundMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboundMessageRepository for PostgresOutboundMessageRepository {
    async fn insert(&self, message: &OutboundMessage) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO outbound_messages (
                id, tenant_id, contact_id, account, to_phone, body, kind, status,
                external_id, error, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.tenant_id.as_uuid())
        .bind(message.contact_id.map(|id| *id.as_uuid()))
        .bind(&message.account)
        .bind(&message.to)
        .bind(&message.body)
        .bind(message.kind.as_str())
        .bind(message.status.as_str())
        .bind(&message.external_id)
        .bind(&message.error)
        .bind(message.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert outbound message", e))?;

        Ok(())
    }

    async fn update(&self, message: &OutboundMessage) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE outbound_messages SET status = $2, external_id = $3, error = $4 WHERE id = $1",
        )
        .bind(message.id.as_uuid())
        .bind(message.status.as_str())
        .bind(&message.external_id)
        .bind(&message.error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update outbound message", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::MessageNotFound,
                format!("Outbound message not found: {}", message.id),
            ));
        }
        Ok(())
    }

    async fn list_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<OutboundMessage>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, contact_id, account, to_phone, body, kind, status,
                   external_id, error, created_at
            FROM outbound_messages
            WHERE tenant_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list outbound messages", e))?;

        rows.iter().map(row_to_message).collect()
    }
}

fn row_to_message(row: &PgRow) -> Result<OutboundMessage, DomainError> {
    let contact_id: Option<uuid::Uuid> = column(row, "contact_id")?;

    Ok(OutboundMessage {
        id: MessageId::from_uuid(column(row, "id")?),
        tenant_id: TenantId::from_uuid(column(row, "tenant_id")?),
        contact_id: contact_id.map(ContactId::from_uuid),
        account: column(row, "account")?,
        to: column(row, "to_phone")?,
        body: column(row, "body")?,
        kind: parse_column(row, "kind")?,
        status: parse_column(row, "status")?,
        external_id: column(row, "external_id")?,
        error: column(row, "error")?,
        created_at: timestamp(row, "created_at")?,
    })
}
