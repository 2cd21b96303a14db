//! PostgreSQL implementations of ChatbotSessionRepository and SessionMessageLog.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::chatbot::{ChatbotSession, SessionMessage};
use crate::domain::foundation::{
    ContactId, DomainError, ErrorCode, FlowId, MessageId, SessionId, TenantId,
};
use crate::domain::template::Vars;
use crate::ports::{ChatbotSessionRepository, SessionMessageLog};

use super::support::{column, optional_datetime, optional_timestamp, parse_column, timestamp, unsigned};

const SELECT_SESSION: &str = r#"
    SELECT id, tenant_id, contact_id, account, phone, status, flow_id, current_step,
           step_retries, data, started_at, last_activity_at, completed_at
    FROM chatbot_sessions
"#;

#[derive(Clone)]
pub struct PostgresChatbotSessionRepository {
    pool: PgPool,
}

impl PostgresChatbotSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatbotSessionRepository for PostgresChatbotSessionRepository {
    async fn insert(&self, session: &ChatbotSession) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chatbot_sessions (
                id, tenant_id, contact_id, account, phone, status, flow_id, current_step,
                step_retries, data, started_at, last_activity_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.tenant_id().as_uuid())
        .bind(session.contact_id().as_uuid())
        .bind(session.account())
        .bind(session.phone())
        .bind(session.status().as_str())
        .bind(session.flow_id().map(|id| *id.as_uuid()))
        .bind(session.current_step())
        .bind(session.step_retries() as i32)
        .bind(Json(session.data()))
        .bind(session.started_at().as_datetime())
        .bind(session.last_activity_at().as_datetime())
        .bind(optional_datetime(session.completed_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert chatbot session", e))?;

        Ok(())
    }

    async fn update(&self, session: &ChatbotSession) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE chatbot_sessions SET
                status = $2,
                flow_id = $3,
                current_step = $4,
                step_retries = $5,
                data = $6,
                last_activity_at = $7,
                completed_at = $8
            WHERE id = $1
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.status().as_str())
        .bind(session.flow_id().map(|id| *id.as_uuid()))
        .bind(session.current_step())
        .bind(session.step_retries() as i32)
        .bind(Json(session.data()))
        .bind(session.last_activity_at().as_datetime())
        .bind(optional_datetime(session.completed_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update chatbot session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Chatbot session not found: {}", session.id()),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<ChatbotSession>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_SESSION))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch chatbot session", e))?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn find_active(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
        account: &str,
    ) -> Result<Option<ChatbotSession>, DomainError> {
        let row = sqlx::query(&format!(
            "{} WHERE tenant_id = $1 AND contact_id = $2 AND account = $3 AND status = 'active' \
             ORDER BY last_activity_at DESC LIMIT 1",
            SELECT_SESSION
        ))
        .bind(tenant_id.as_uuid())
        .bind(contact_id.as_uuid())
        .bind(account)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch active chatbot session", e))?;

        row.as_ref().map(row_to_session).transpose()
    }
}

fn row_to_session(row: &PgRow) -> Result<ChatbotSession, DomainError> {
    let flow_id: Option<uuid::Uuid> = column(row, "flow_id")?;
    let Json(data): Json<Vars> = column(row, "data")?;

    Ok(ChatbotSession::reconstitute(
        SessionId::from_uuid(column(row, "id")?),
        TenantId::from_uuid(column(row, "tenant_id")?),
        ContactId::from_uuid(column(row, "contact_id")?),
        column(row, "account")?,
        column(row, "phone")?,
        parse_column(row, "status")?,
        flow_id.map(FlowId::from_uuid),
        column(row, "current_step")?,
        unsigned(row, "step_retries")?,
        data,
        timestamp(row, "started_at")?,
        timestamp(row, "last_activity_at")?,
        optional_timestamp(row, "completed_at")?,
    ))
}

#[derive(Clone)]
pub struct PostgresSessionMessageLog {
    pool: PgPool,
}

impl PostgresSessionMessageLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionMessageLog for PostgresSessionMessageLog {
    async fn append(&self, message: &SessionMessage) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chatbot_session_messages (
                id, session_id, direction, body, step_name, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.session_id.as_uuid())
        .bind(message.direction.as_str())
        .bind(&message.body)
        .bind(&message.step_name)
        .bind(message.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to append session message", e))?;

        Ok(())
    }

    async fn list(&self, session_id: &SessionId) -> Result<Vec<SessionMessage>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, direction, body, step_name, created_at
            FROM chatbot_session_messages
            WHERE session_id = $1
            ORDER BY seq
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list session messages", e))?;

        rows.iter()
            .map(|row| {
                Ok(SessionMessage {
                    id: MessageId::from_uuid(column(row, "id")?),
                    session_id: SessionId::from_uuid(column(row, "session_id")?),
                    direction: parse_column(row, "direction")?,
                    body: column(row, "body")?,
                    step_name: column(row, "step_name")?,
                    created_at: timestamp(row, "created_at")?,
                })
            })
            .collect()
    }
}
