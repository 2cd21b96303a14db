//! PostgreSQL implementation of TransferRepository.
//!
//! SLA tracking is flattened into `sla_*` columns on the transfer row.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{
    AgentId, ContactId, DomainError, ErrorCode, TeamId, TenantId, Timestamp, TransferId,
};
use crate::domain::sla::{AgentTransfer, SlaTracking, CRITICAL_ESCALATION_LEVEL};
use crate::ports::TransferRepository;

use super::support::{column, optional_datetime, optional_timestamp, parse_column, timestamp};

const SELECT_TRANSFER: &str = r#"
    SELECT id, tenant_id, contact_id, account, phone, status, source, agent_id, team_id,
           notes, transferred_at, ended_at, last_agent_message_at,
           sla_response_deadline, sla_resolution_deadline, sla_escalation_at, sla_expires_at,
           sla_escalated_at, sla_last_checked_at, sla_picked_up_at, sla_first_response_at,
           sla_escalation_level, sla_breached, sla_breached_at
    FROM agent_transfers
"#;

#[derive(Clone)]
pub struct PostgresTransferRepository {
    pool: PgPool,
}

impl PostgresTransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        condition: &str,
        tenant_id: &TenantId,
        now: &Timestamp,
        context: &str,
    ) -> Result<Vec<AgentTransfer>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE tenant_id = $1 AND status = 'active' AND {} ORDER BY transferred_at, id",
            SELECT_TRANSFER, condition
        ))
        .bind(tenant_id.as_uuid())
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(context, e))?;

        rows.iter().map(row_to_transfer).collect()
    }
}

#[async_trait]
impl TransferRepository for PostgresTransferRepository {
    async fn insert(&self, transfer: &AgentTransfer) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO agent_transfers (
                id, tenant_id, contact_id, account, phone, status, source, agent_id, team_id,
                notes, transferred_at, ended_at, last_agent_message_at,
                sla_response_deadline, sla_resolution_deadline, sla_escalation_at, sla_expires_at,
                sla_escalated_at, sla_last_checked_at, sla_picked_up_at, sla_first_response_at,
                sla_escalation_level, sla_breached, sla_breached_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                      $17, $18, $19, $20, $21, $22, $23, $24)
            "#,
        )
        .bind(transfer.id.as_uuid())
        .bind(transfer.tenant_id.as_uuid())
        .bind(transfer.contact_id.as_uuid())
        .bind(&transfer.account)
        .bind(&transfer.phone)
        .bind(transfer.status.as_str())
        .bind(transfer.source.as_str())
        .bind(transfer.agent_id.map(|id| *id.as_uuid()))
        .bind(transfer.team_id.map(|id| *id.as_uuid()))
        .bind(&transfer.notes)
        .bind(transfer.transferred_at.as_datetime())
        .bind(optional_datetime(transfer.ended_at.as_ref()))
        .bind(optional_datetime(transfer.last_agent_message_at.as_ref()))
        .bind(optional_datetime(transfer.sla.response_deadline.as_ref()))
        .bind(optional_datetime(transfer.sla.resolution_deadline.as_ref()))
        .bind(optional_datetime(transfer.sla.escalation_at.as_ref()))
        .bind(optional_datetime(transfer.sla.expires_at.as_ref()))
        .bind(optional_datetime(transfer.sla.escalated_at.as_ref()))
        .bind(optional_datetime(transfer.sla.last_checked_at.as_ref()))
        .bind(optional_datetime(transfer.sla.picked_up_at.as_ref()))
        .bind(optional_datetime(transfer.sla.first_response_at.as_ref()))
        .bind(transfer.sla.escalation_level as i16)
        .bind(transfer.sla.breached)
        .bind(optional_datetime(transfer.sla.breached_at.as_ref()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert transfer", e))?;

        Ok(())
    }

    async fn update(&self, transfer: &AgentTransfer) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE agent_transfers SET
                status = $2,
                agent_id = $3,
                team_id = $4,
                notes = $5,
                ended_at = $6,
                last_agent_message_at = $7,
                sla_response_deadline = $8,
                sla_resolution_deadline = $9,
                sla_escalation_at = $10,
                sla_expires_at = $11,
                sla_escalated_at = $12,
                sla_last_checked_at = $13,
                sla_picked_up_at = $14,
                sla_first_response_at = $15,
                sla_escalation_level = $16,
                sla_breached = sla_breached OR $17,
                sla_breached_at = COALESCE(sla_breached_at, $18)
            WHERE id = $1
            "#,
        )
        .bind(transfer.id.as_uuid())
        .bind(transfer.status.as_str())
        .bind(transfer.agent_id.map(|id| *id.as_uuid()))
        .bind(transfer.team_id.map(|id| *id.as_uuid()))
        .bind(&transfer.notes)
        .bind(optional_datetime(transfer.ended_at.as_ref()))
        .bind(optional_datetime(transfer.last_agent_message_at.as_ref()))
        .bind(optional_datetime(transfer.sla.response_deadline.as_ref()))
        .bind(optional_datetime(transfer.sla.resolution_deadline.as_ref()))
        .bind(optional_datetime(transfer.sla.escalation_at.as_ref()))
        .bind(optional_datetime(transfer.sla.expires_at.as_ref()))
        .bind(optional_datetime(transfer.sla.escalated_at.as_ref()))
        .bind(optional_datetime(transfer.sla.last_checked_at.as_ref()))
        .bind(optional_datetime(transfer.sla.picked_up_at.as_ref()))
        .bind(optional_datetime(transfer.sla.first_response_at.as_ref()))
        .bind(transfer.sla.escalation_level as i16)
        .bind(transfer.sla.breached)
        .bind(optional_datetime(transfer.sla.breached_at.as_ref()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update transfer", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::TransferNotFound,
                format!("Transfer not found: {}", transfer.id),
            ));
        }
        Ok(())
    }

    async fn record_escalation(&self, transfer: &AgentTransfer) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE agent_transfers SET
                sla_escalation_level = $2,
                sla_escalated_at = $3,
                sla_escalation_at = $4,
                sla_last_checked_at = $5,
                sla_breached = sla_breached OR $6,
                sla_breached_at = COALESCE(sla_breached_at, $7)
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(transfer.id.as_uuid())
        .bind(transfer.sla.escalation_level as i16)
        .bind(optional_datetime(transfer.sla.escalated_at.as_ref()))
        .bind(optional_datetime(transfer.sla.escalation_at.as_ref()))
        .bind(optional_datetime(transfer.sla.last_checked_at.as_ref()))
        .bind(transfer.sla.breached)
        .bind(optional_datetime(transfer.sla.breached_at.as_ref()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record transfer escalation", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire(
        &self,
        tenant_id: &TenantId,
        id: &TransferId,
        ended_at: &Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE agent_transfers SET
                status = 'expired',
                ended_at = $3
            WHERE tenant_id = $1 AND id = $2 AND status = 'active'
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .bind(ended_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to expire transfer", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &TransferId,
    ) -> Result<Option<AgentTransfer>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE tenant_id = $1 AND id = $2", SELECT_TRANSFER))
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch transfer", e))?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn list_expired(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<Vec<AgentTransfer>, DomainError> {
        self.fetch_where(
            "sla_expires_at <= $2",
            tenant_id,
            now,
            "Failed to list expired transfers",
        )
        .await
    }

    async fn list_due_for_escalation(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<Vec<AgentTransfer>, DomainError> {
        self.fetch_where(
            &format!(
                "sla_escalation_at <= $2 AND sla_escalation_level < {}",
                CRITICAL_ESCALATION_LEVEL
            ),
            tenant_id,
            now,
            "Failed to list transfers due for escalation",
        )
        .await
    }

    async fn mark_breached_unassigned(
        &self,
        tenant_id: &TenantId,
        now: &Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE agent_transfers SET
                sla_breached = TRUE,
                sla_breached_at = $2
            WHERE tenant_id = $1
              AND status = 'active'
              AND agent_id IS NULL
              AND NOT sla_breached
              AND sla_response_deadline <= $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark breached transfers", e))?;

        Ok(result.rows_affected())
    }

    async fn has_active_for_contact(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
    ) -> Result<bool, DomainError> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM agent_transfers
                WHERE tenant_id = $1 AND contact_id = $2 AND status = 'active'
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(contact_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check active transfers", e))?;

        Ok(result.0)
    }
}

fn row_to_transfer(row: &PgRow) -> Result<AgentTransfer, DomainError> {
    let agent_id: Option<uuid::Uuid> = column(row, "agent_id")?;
    let team_id: Option<uuid::Uuid> = column(row, "team_id")?;
    let level: i16 = column(row, "sla_escalation_level")?;

    Ok(AgentTransfer {
        id: TransferId::from_uuid(column(row, "id")?),
        tenant_id: TenantId::from_uuid(column(row, "tenant_id")?),
        contact_id: ContactId::from_uuid(column(row, "contact_id")?),
        account: column(row, "account")?,
        phone: column(row, "phone")?,
        status: parse_column(row, "status")?,
        source: parse_column(row, "source")?,
        agent_id: agent_id.map(AgentId::from_uuid),
        team_id: team_id.map(TeamId::from_uuid),
        notes: column(row, "notes")?,
        transferred_at: timestamp(row, "transferred_at")?,
        ended_at: optional_timestamp(row, "ended_at")?,
        last_agent_message_at: optional_timestamp(row, "last_agent_message_at")?,
        sla: SlaTracking {
            response_deadline: optional_timestamp(row, "sla_response_deadline")?,
            resolution_deadline: optional_timestamp(row, "sla_resolution_deadline")?,
            escalation_at: optional_timestamp(row, "sla_escalation_at")?,
            expires_at: optional_timestamp(row, "sla_expires_at")?,
            escalated_at: optional_timestamp(row, "sla_escalated_at")?,
            last_checked_at: optional_timestamp(row, "sla_last_checked_at")?,
            picked_up_at: optional_timestamp(row, "sla_picked_up_at")?,
            first_response_at: optional_timestamp(row, "sla_first_response_at")?,
            escalation_level: level.clamp(0, CRITICAL_ESCALATION_LEVEL as i16) as u8,
            breached: column(row, "sla_breached")?,
            breached_at: optional_timestamp(row, "sla_breached_at")?,
        },
    })
}
