//! PostgreSQL implementation of SlaSettingsRepository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::sla::SlaSettings;
use crate::ports::SlaSettingsRepository;

use super::support::{column, timestamp, unsigned};

const SELECT_SETTINGS: &str = r#"
    SELECT tenant_id, enabled, response_time_minutes, resolution_time_minutes,
           escalation_time_minutes, auto_close_hours, auto_close_message, warning_message,
           escalation_notify_phones, client_reminder_enabled, client_reminder_minutes,
           client_reminder_message, client_auto_close_enabled, client_auto_close_minutes,
           client_auto_close_message, updated_at
    FROM tenant_sla_settings
"#;

#[derive(Clone)]
pub struct PostgresSlaSettingsRepository {
    pool: PgPool,
}

impl PostgresSlaSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlaSettingsRepository for PostgresSlaSettingsRepository {
    async fn save(&self, settings: &SlaSettings) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_sla_settings (
                tenant_id, enabled, response_time_minutes, resolution_time_minutes,
                escalation_time_minutes, auto_close_hours, auto_close_message, warning_message,
                escalation_notify_phones, client_reminder_enabled, client_reminder_minutes,
                client_reminder_message, client_auto_close_enabled, client_auto_close_minutes,
                client_auto_close_message, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (tenant_id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                response_time_minutes = EXCLUDED.response_time_minutes,
                resolution_time_minutes = EXCLUDED.resolution_time_minutes,
                escalation_time_minutes = EXCLUDED.escalation_time_minutes,
                auto_close_hours = EXCLUDED.auto_close_hours,
                auto_close_message = EXCLUDED.auto_close_message,
                warning_message = EXCLUDED.warning_message,
                escalation_notify_phones = EXCLUDED.escalation_notify_phones,
                client_reminder_enabled = EXCLUDED.client_reminder_enabled,
                client_reminder_minutes = EXCLUDED.client_reminder_minutes,
                client_reminder_message = EXCLUDED.client_reminder_message,
                client_auto_close_enabled = EXCLUDED.client_auto_close_enabled,
                client_auto_close_minutes = EXCLUDED.client_auto_close_minutes,
                client_auto_close_message = EXCLUDED.client_auto_close_message,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(settings.tenant_id.as_uuid())
        .bind(settings.enabled)
        .bind(settings.response_time_minutes as i32)
        .bind(settings.resolution_time_minutes as i32)
        .bind(settings.escalation_time_minutes as i32)
        .bind(settings.auto_close_hours as i32)
        .bind(&settings.auto_close_message)
        .bind(&settings.warning_message)
        .bind(&settings.escalation_notify_phones)
        .bind(settings.client_reminder_enabled)
        .bind(settings.client_reminder_minutes as i32)
        .bind(&settings.client_reminder_message)
        .bind(settings.client_auto_close_enabled)
        .bind(settings.client_auto_close_minutes as i32)
        .bind(&settings.client_auto_close_message)
        .bind(settings.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save SLA settings", e))?;

        Ok(())
    }

    async fn find(&self, tenant_id: &TenantId) -> Result<Option<SlaSettings>, DomainError> {
        let row = sqlx::query(&format!("{} WHERE tenant_id = $1", SELECT_SETTINGS))
            .bind(tenant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch SLA settings", e))?;

        row.as_ref().map(row_to_settings).transpose()
    }

    async fn list_enabled(&self) -> Result<Vec<SlaSettings>, DomainError> {
        let rows = sqlx::query(&format!(
            "{} WHERE enabled ORDER BY tenant_id",
            SELECT_SETTINGS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list SLA settings", e))?;

        rows.iter().map(row_to_settings).collect()
    }
}

fn row_to_settings(row: &PgRow) -> Result<SlaSettings, DomainError> {
    Ok(SlaSettings {
        tenant_id: TenantId::from_uuid(column(row, "tenant_id")?),
        enabled: column(row, "enabled")?,
        response_time_minutes: unsigned(row, "response_time_minutes")?,
        resolution_time_minutes: unsigned(row, "resolution_time_minutes")?,
        escalation_time_minutes: unsigned(row, "escalation_time_minutes")?,
        auto_close_hours: unsigned(row, "auto_close_hours")?,
        auto_close_message: column(row, "auto_close_message")?,
        warning_message: column(row, "warning_message")?,
        escalation_notify_phones: column(row, "escalation_notify_phones")?,
        client_reminder_enabled: column(row, "client_reminder_enabled")?,
        client_reminder_minutes: unsigned(row, "client_reminder_minutes")?,
        client_reminder_message: column(row, "client_reminder_message")?,
        client_auto_close_enabled: column(row, "client_auto_close_enabled")?,
        client_auto_close_minutes: unsigned(row, "client_auto_close_minutes")?,
        client_auto_close_message: column(row, "client_auto_close_message")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}
