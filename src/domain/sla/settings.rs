//! Tenant SLA configuration.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TenantId, Timestamp};

/// Fallback reminder text when a tenant enables reminders without a message.
pub const DEFAULT_REMINDER_MESSAGE: &str =
    "Are you still there? Reply to continue the conversation.";

/// Fallback closing text when a tenant enables inactivity auto-close without a message.
pub const DEFAULT_INACTIVITY_CLOSE_MESSAGE: &str =
    "This conversation was closed due to inactivity. Message us any time to start again.";

/// Per-tenant SLA thresholds and customer-facing texts.
///
/// A zero threshold disables the corresponding deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaSettings {
    pub tenant_id: TenantId,
    pub enabled: bool,

    // Agent transfer deadlines
    pub response_time_minutes: u32,
    pub resolution_time_minutes: u32,
    pub escalation_time_minutes: u32,
    pub auto_close_hours: u32,

    /// Sent to the customer when a transfer is auto-closed.
    pub auto_close_message: Option<String>,
    /// Sent to the customer on the first escalation of a transfer.
    pub warning_message: Option<String>,
    /// Phones notified on every escalation.
    pub escalation_notify_phones: Vec<String>,

    // Chatbot client inactivity
    pub client_reminder_enabled: bool,
    pub client_reminder_minutes: u32,
    pub client_reminder_message: Option<String>,
    pub client_auto_close_enabled: bool,
    pub client_auto_close_minutes: u32,
    pub client_auto_close_message: Option<String>,

    pub updated_at: Timestamp,
}

impl SlaSettings {
    /// Settings with SLA tracking disabled and every threshold off.
    pub fn disabled(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            enabled: false,
            response_time_minutes: 0,
            resolution_time_minutes: 0,
            escalation_time_minutes: 0,
            auto_close_hours: 0,
            auto_close_message: None,
            warning_message: None,
            escalation_notify_phones: Vec::new(),
            client_reminder_enabled: false,
            client_reminder_minutes: 0,
            client_reminder_message: None,
            client_auto_close_enabled: false,
            client_auto_close_minutes: 0,
            client_auto_close_message: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Enabled settings with the given agent deadlines and no client handling.
    pub fn enabled(
        tenant_id: TenantId,
        response_time_minutes: u32,
        resolution_time_minutes: u32,
        escalation_time_minutes: u32,
        auto_close_hours: u32,
    ) -> Self {
        Self {
            enabled: true,
            response_time_minutes,
            resolution_time_minutes,
            escalation_time_minutes,
            auto_close_hours,
            ..Self::disabled(tenant_id)
        }
    }

    pub fn reminder_text(&self) -> &str {
        non_blank(&self.client_reminder_message).unwrap_or(DEFAULT_REMINDER_MESSAGE)
    }

    pub fn inactivity_close_text(&self) -> &str {
        non_blank(&self.client_auto_close_message).unwrap_or(DEFAULT_INACTIVITY_CLOSE_MESSAGE)
    }

    pub fn auto_close_text(&self) -> Option<&str> {
        non_blank(&self.auto_close_message)
    }

    pub fn warning_text(&self) -> Option<&str> {
        non_blank(&self.warning_message)
    }

    /// Whether the client-inactivity pass has anything to do.
    pub fn handles_client_inactivity(&self) -> bool {
        (self.client_reminder_enabled && self.client_reminder_minutes > 0)
            || (self.client_auto_close_enabled && self.client_auto_close_minutes > 0)
    }
}

fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_settings_turn_everything_off() {
        let s = SlaSettings::disabled(TenantId::new());
        assert!(!s.enabled);
        assert!(!s.handles_client_inactivity());
        assert_eq!(s.auto_close_text(), None);
    }

    #[test]
    fn blank_messages_fall_back() {
        let mut s = SlaSettings::enabled(TenantId::new(), 5, 60, 10, 24);
        s.client_reminder_message = Some("  ".to_string());
        s.warning_message = Some("".to_string());
        assert_eq!(s.reminder_text(), DEFAULT_REMINDER_MESSAGE);
        assert_eq!(s.warning_text(), None);
    }

    #[test]
    fn client_handling_needs_enabled_flag_and_threshold() {
        let mut s = SlaSettings::enabled(TenantId::new(), 0, 0, 0, 0);
        s.client_reminder_enabled = true;
        assert!(!s.handles_client_inactivity());
        s.client_reminder_minutes = 15;
        assert!(s.handles_client_inactivity());
    }
}
