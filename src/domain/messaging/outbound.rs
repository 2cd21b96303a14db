//! Persisted record of automated outbound sends.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{
    ContactId, MessageId, StateMachine, TenantId, Timestamp, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl StateMachine for DeliveryStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            DeliveryStatus::Pending => vec![DeliveryStatus::Sent, DeliveryStatus::Failed],
            DeliveryStatus::Sent | DeliveryStatus::Failed => vec![],
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "delivery_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Why the engine sent a message on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    TransferAutoClose,
    EscalationWarning,
    EscalationNotice,
    InactivityReminder,
    InactivityClose,
}

impl OutboundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundKind::TransferAutoClose => "transfer_auto_close",
            OutboundKind::EscalationWarning => "escalation_warning",
            OutboundKind::EscalationNotice => "escalation_notice",
            OutboundKind::InactivityReminder => "inactivity_reminder",
            OutboundKind::InactivityClose => "inactivity_close",
        }
    }
}

impl FromStr for OutboundKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_auto_close" => Ok(OutboundKind::TransferAutoClose),
            "escalation_warning" => Ok(OutboundKind::EscalationWarning),
            "escalation_notice" => Ok(OutboundKind::EscalationNotice),
            "inactivity_reminder" => Ok(OutboundKind::InactivityReminder),
            "inactivity_close" => Ok(OutboundKind::InactivityClose),
            other => Err(ValidationError::invalid_format(
                "outbound_kind",
                format!("unknown kind '{}'", other),
            )),
        }
    }
}

/// An automated message and its delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub tenant_id: TenantId,
    pub contact_id: Option<ContactId>,
    pub account: String,
    pub to: String,
    pub body: String,
    pub kind: OutboundKind,
    pub status: DeliveryStatus,
    pub external_id: Option<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
}

impl OutboundMessage {
    pub fn pending(
        tenant_id: TenantId,
        contact_id: Option<ContactId>,
        account: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
        kind: OutboundKind,
        now: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::new(),
            tenant_id,
            contact_id,
            account: account.into(),
            to: to.into(),
            body: body.into(),
            kind,
            status: DeliveryStatus::Pending,
            external_id: None,
            error: None,
            created_at: now,
        }
    }

    pub fn mark_sent(&mut self, external_id: impl Into<String>) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(DeliveryStatus::Sent)?;
        self.external_id = Some(external_id.into());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(DeliveryStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboundMessage {
        OutboundMessage::pending(
            TenantId::new(),
            None,
            "main",
            "+15550100",
            "hello",
            OutboundKind::InactivityReminder,
            Timestamp::now(),
        )
    }

    #[test]
    fn sent_message_keeps_external_id() {
        let mut m = message();
        m.mark_sent("wamid.1").unwrap();
        assert_eq!(m.status, DeliveryStatus::Sent);
        assert_eq!(m.external_id.as_deref(), Some("wamid.1"));
    }

    #[test]
    fn failed_message_keeps_error_and_is_final() {
        let mut m = message();
        m.mark_failed("gateway timeout").unwrap();
        assert_eq!(m.error.as_deref(), Some("gateway timeout"));
        assert!(m.mark_sent("late").is_err());
    }

    #[test]
    fn kinds_round_trip_through_strings() {
        let kind: OutboundKind = "escalation_warning".parse().unwrap();
        assert_eq!(kind.as_str(), "escalation_warning");
    }
}
