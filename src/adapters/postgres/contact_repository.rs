//! PostgreSQL implementation of ContactRepository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{ContactId, DomainError, ErrorCode, TenantId};
use crate::domain::messaging::Contact;
use crate::ports::ContactRepository;

use super::support::{column, optional_datetime, optional_timestamp};

const SELECT_CONTACT: &str = r#"
    SELECT id, tenant_id, account, phone, name, last_message_at,
           chatbot_last_message_at, chatbot_reminder_sent
    FROM contacts
"#;

#[derive(Clone)]
pub struct PostgresContactRepository {
    pool: PgPool,
}

impl PostgresContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PostgresContactRepository {
    async fn save(&self, contact: &Contact) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO contacts (
                id, tenant_id, account, phone, name, last_message_at,
                chatbot_last_message_at, chatbot_reminder_sent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                last_message_at = EXCLUDED.last_message_at,
                chatbot_last_message_at = EXCLUDED.chatbot_last_message_at,
                chatbot_reminder_sent = EXCLUDED.chatbot_reminder_sent
            "#,
        )
        .bind(contact.id.as_uuid())
        .bind(contact.tenant_id.as_uuid())
        .bind(&contact.account)
        .bind(&contact.phone)
        .bind(&contact.name)
        .bind(optional_datetime(contact.last_message_at.as_ref()))
        .bind(optional_datetime(contact.chatbot_last_message_at.as_ref()))
        .bind(contact.chatbot_reminder_sent)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save contact", e))?;

        Ok(())
    }

    async fn update(&self, contact: &Contact) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts SET
                name = $2,
                last_message_at = $3,
                chatbot_last_message_at = $4,
                chatbot_reminder_sent = $5
            WHERE id = $1
            "#,
        )
        .bind(contact.id.as_uuid())
        .bind(&contact.name)
        .bind(optional_datetime(contact.last_message_at.as_ref()))
        .bind(optional_datetime(contact.chatbot_last_message_at.as_ref()))
        .bind(contact.chatbot_reminder_sent)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update contact", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ContactNotFound,
                format!("Contact not found: {}", contact.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ContactId,
    ) -> Result<Option<Contact>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE tenant_id = $1 AND id = $2", SELECT_CONTACT))
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch contact", e))?;

        row.as_ref().map(row_to_contact).transpose()
    }

    async fn list_awaiting_reply(&self, tenant_id: &TenantId) -> Result<Vec<Contact>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE tenant_id = $1 AND chatbot_last_message_at IS NOT NULL \
             AND (last_message_at IS NULL OR chatbot_last_message_at > last_message_at) \
             ORDER BY chatbot_last_message_at",
            SELECT_CONTACT
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list contacts awaiting reply", e))?;

        rows.iter().map(row_to_contact).collect()
    }
}

fn row_to_contact(row: &PgRow) -> Result<Contact, DomainError> {
    Ok(Contact {
        id: ContactId::from_uuid(column(row, "id")?),
        tenant_id: TenantId::from_uuid(column(row, "tenant_id")?),
        account: column(row, "account")?,
        phone: column(row, "phone")?,
        name: column(row, "name")?,
        last_message_at: optional_timestamp(row, "last_message_at")?,
        chatbot_last_message_at: optional_timestamp(row, "chatbot_last_message_at")?,
        chatbot_reminder_sent: column(row, "chatbot_reminder_sent")?,
    })
}
