//! Agent transfers and their embedded SLA tracking.
//!
//! Deadlines are computed once when the transfer is created. The SLA
//! processor only ever moves `escalation_at` forward, either after an
//! escalation or when the agent has replied since the last check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    AgentId, ContactId, StateMachine, TeamId, TenantId, Timestamp, TransferId, ValidationError,
};

use super::settings::SlaSettings;

/// Highest escalation level; transfers at this level are never escalated again.
pub const CRITICAL_ESCALATION_LEVEL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    #[default]
    Active,
    /// Handed back to automation.
    Resumed,
    /// Auto-closed by the SLA processor.
    Expired,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Active => "active",
            TransferStatus::Resumed => "resumed",
            TransferStatus::Expired => "expired",
        }
    }
}

impl StateMachine for TransferStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransferStatus::*;
        match self {
            Active => vec![Resumed, Expired],
            Resumed | Expired => vec![],
        }
    }
}

impl FromStr for TransferStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TransferStatus::Active),
            "resumed" => Ok(TransferStatus::Resumed),
            "expired" => Ok(TransferStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "transfer_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What handed the conversation to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferSource {
    Manual,
    Flow,
    Keyword,
    ChatbotDisabled,
}

impl TransferSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferSource::Manual => "manual",
            TransferSource::Flow => "flow",
            TransferSource::Keyword => "keyword",
            TransferSource::ChatbotDisabled => "chatbot_disabled",
        }
    }
}

impl FromStr for TransferSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(TransferSource::Manual),
            "flow" => Ok(TransferSource::Flow),
            "keyword" => Ok(TransferSource::Keyword),
            "chatbot_disabled" => Ok(TransferSource::ChatbotDisabled),
            other => Err(ValidationError::invalid_format(
                "transfer_source",
                format!("unknown source '{}'", other),
            )),
        }
    }
}

impl fmt::Display for TransferSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SLA deadlines and progress markers for one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaTracking {
    pub response_deadline: Option<Timestamp>,
    pub resolution_deadline: Option<Timestamp>,
    pub escalation_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub escalated_at: Option<Timestamp>,
    pub last_checked_at: Option<Timestamp>,
    pub picked_up_at: Option<Timestamp>,
    pub first_response_at: Option<Timestamp>,
    pub escalation_level: u8,
    pub breached: bool,
    pub breached_at: Option<Timestamp>,
}

impl SlaTracking {
    fn response_overdue(&self, now: &Timestamp) -> bool {
        self.response_deadline
            .map(|deadline| !deadline.is_after(now))
            .unwrap_or(false)
    }

    fn mark_breached(&mut self, now: Timestamp) {
        if !self.breached {
            self.breached = true;
            self.breached_at = Some(now);
        }
    }
}

/// Outcome of evaluating a transfer for escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// The agent replied since the last check; the escalation was pushed back.
    Deferred,
    /// The level went up; `first` is true on the move from normal to warning.
    Escalated { level: u8, first: bool, newly_breached: bool },
}

/// A conversation handed from automation to a human agent or team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTransfer {
    pub id: TransferId,
    pub tenant_id: TenantId,
    pub contact_id: ContactId,
    pub account: String,
    pub phone: String,
    pub status: TransferStatus,
    pub source: TransferSource,
    pub agent_id: Option<AgentId>,
    pub team_id: Option<TeamId>,
    pub notes: Option<String>,
    pub transferred_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub last_agent_message_at: Option<Timestamp>,
    pub sla: SlaTracking,
}

impl AgentTransfer {
    /// Creates an active, unassigned transfer with no SLA deadlines.
    pub fn new(
        tenant_id: TenantId,
        contact_id: ContactId,
        account: impl Into<String>,
        phone: impl Into<String>,
        source: TransferSource,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransferId::new(),
            tenant_id,
            contact_id,
            account: account.into(),
            phone: phone.into(),
            status: TransferStatus::Active,
            source,
            agent_id: None,
            team_id: None,
            notes: None,
            transferred_at: now,
            ended_at: None,
            last_agent_message_at: None,
            sla: SlaTracking::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TransferStatus::Active
    }

    pub fn is_assigned(&self) -> bool {
        self.agent_id.is_some()
    }

    /// Computes the four deadlines from tenant settings.
    ///
    /// Thresholds that are zero, and all of them when SLA is disabled or
    /// unconfigured, leave the deadline unset.
    pub fn set_sla_deadlines(&mut self, settings: Option<&SlaSettings>, now: Timestamp) {
        self.sla.response_deadline = None;
        self.sla.resolution_deadline = None;
        self.sla.escalation_at = None;
        self.sla.expires_at = None;

        let Some(settings) = settings.filter(|s| s.enabled) else {
            return;
        };

        let after = |minutes: u32| (minutes > 0).then(|| now.plus_minutes(minutes as i64));
        self.sla.response_deadline = after(settings.response_time_minutes);
        self.sla.resolution_deadline = after(settings.resolution_time_minutes);
        self.sla.escalation_at = after(settings.escalation_time_minutes);
        self.sla.expires_at =
            (settings.auto_close_hours > 0).then(|| now.plus_hours(settings.auto_close_hours as i64));
    }

    /// Assigns the agent and stamps pick-up time.
    ///
    /// Breaches the SLA iff pick-up happens strictly after the response deadline.
    pub fn record_pickup(&mut self, agent_id: AgentId, now: Timestamp) {
        self.agent_id = Some(agent_id);
        self.sla.picked_up_at = Some(now);
        if self
            .sla
            .response_deadline
            .map(|deadline| now.is_after(&deadline))
            .unwrap_or(false)
        {
            self.sla.mark_breached(now);
        }
    }

    /// Stamps the first agent response. Returns false if already stamped.
    pub fn record_first_response(&mut self, now: Timestamp) -> bool {
        if self.sla.first_response_at.is_some() {
            return false;
        }
        self.sla.first_response_at = Some(now);
        true
    }

    pub fn record_agent_message(&mut self, now: Timestamp) {
        self.last_agent_message_at = Some(now);
    }

    pub fn is_expiry_due(&self, now: &Timestamp) -> bool {
        self.is_active()
            && self
                .sla
                .expires_at
                .map(|at| !at.is_after(now))
                .unwrap_or(false)
    }

    /// Marks the transfer expired.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` (state_transition) if the transfer is no longer active
    pub fn expire(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(TransferStatus::Expired)?;
        self.ended_at = Some(now);
        Ok(())
    }

    pub fn is_escalation_due(&self, now: &Timestamp) -> bool {
        self.is_active()
            && self.sla.escalation_level < CRITICAL_ESCALATION_LEVEL
            && self
                .sla
                .escalation_at
                .map(|at| !at.is_after(now))
                .unwrap_or(false)
    }

    /// True if the agent has written since the last escalation, check or creation.
    pub fn agent_replied_since_last_check(&self) -> bool {
        let reference = [self.sla.escalated_at, self.sla.last_checked_at]
            .into_iter()
            .flatten()
            .fold(self.transferred_at, |latest, t| latest.max(t));
        self.last_agent_message_at
            .map(|at| at.is_after(&reference))
            .unwrap_or(false)
    }

    /// Escalates the transfer, or defers it when the agent has replied.
    ///
    /// `escalation_minutes` reschedules the next evaluation; zero leaves
    /// `escalation_at` where it is.
    pub fn escalate(&mut self, now: Timestamp, escalation_minutes: u32) -> EscalationOutcome {
        if self.agent_replied_since_last_check() {
            self.sla.last_checked_at = Some(now);
            self.reschedule_escalation(now, escalation_minutes);
            return EscalationOutcome::Deferred;
        }

        let first = self.sla.escalation_level == 0;
        self.sla.escalation_level = (self.sla.escalation_level + 1).min(CRITICAL_ESCALATION_LEVEL);
        self.sla.escalated_at = Some(now);
        self.sla.last_checked_at = Some(now);

        let newly_breached = !self.sla.breached && self.sla.response_overdue(&now);
        if newly_breached {
            self.sla.mark_breached(now);
        }

        if self.sla.escalation_level < CRITICAL_ESCALATION_LEVEL {
            self.reschedule_escalation(now, escalation_minutes);
        }

        EscalationOutcome::Escalated {
            level: self.sla.escalation_level,
            first,
            newly_breached,
        }
    }

    fn reschedule_escalation(&mut self, now: Timestamp, escalation_minutes: u32) {
        if escalation_minutes > 0 {
            self.sla.escalation_at = Some(now.plus_minutes(escalation_minutes as i64));
        }
    }

    /// Active, unassigned, not yet flagged and past its response deadline.
    pub fn is_breach_due(&self, now: &Timestamp) -> bool {
        self.is_active() && !self.is_assigned() && !self.sla.breached && self.sla.response_overdue(now)
    }

    /// Flags the breach once; later calls keep the original timestamp.
    pub fn mark_breached(&mut self, now: Timestamp) {
        self.sla.mark_breached(now);
    }
}
