//! Chatbot session aggregate.
//!
//! A session is the live state of one contact on one channel account:
//! which flow and step it is in, how many invalid answers it has given,
//! and the variables captured so far.
//!
//! # Ownership
//!
//! The session exclusively owns its data document. Callers read it through
//! [`ChatbotSession::data`] and change it only through the mutation methods
//! here, within the handling of a single event.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    ContactId, FlowId, SessionId, StateMachine, TenantId, Timestamp, ValidationError,
};
use crate::domain::template::Vars;

/// Lifecycle status of a chatbot session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
    Timeout,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Timeout => "timeout",
        }
    }
}

impl StateMachine for SessionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionStatus::*;
        match self {
            Active => vec![Completed, Cancelled, Timeout],
            Completed | Cancelled | Timeout => vec![],
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "timeout" => Ok(SessionStatus::Timeout),
            other => Err(ValidationError::invalid_format(
                "session_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guided conversation state for a (tenant, contact, account) triple.
///
/// # Invariants
///
/// - `current_step` is only set while `status` is `Active` and a flow is set
/// - terminal sessions have `completed_at` set and are never reopened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotSession {
    id: SessionId,
    tenant_id: TenantId,
    contact_id: ContactId,
    account: String,
    phone: String,
    status: SessionStatus,
    flow_id: Option<FlowId>,
    current_step: Option<String>,
    step_retries: u32,
    data: Vars,
    started_at: Timestamp,
    last_activity_at: Timestamp,
    completed_at: Option<Timestamp>,
}

impl ChatbotSession {
    /// Creates a new active session with no flow.
    pub fn new(
        tenant_id: TenantId,
        contact_id: ContactId,
        account: impl Into<String>,
        phone: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SessionId::new(),
            tenant_id,
            contact_id,
            account: account.into(),
            phone: phone.into(),
            status: SessionStatus::Active,
            flow_id: None,
            current_step: None,
            step_retries: 0,
            data: Vars::new(),
            started_at: now,
            last_activity_at: now,
            completed_at: None,
        }
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        tenant_id: TenantId,
        contact_id: ContactId,
        account: String,
        phone: String,
        status: SessionStatus,
        flow_id: Option<FlowId>,
        current_step: Option<String>,
        step_retries: u32,
        data: Vars,
        started_at: Timestamp,
        last_activity_at: Timestamp,
        completed_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            contact_id,
            account,
            phone,
            status,
            flow_id,
            current_step,
            step_retries,
            data,
            started_at,
            last_activity_at,
            completed_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn contact_id(&self) -> &ContactId {
        &self.contact_id
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn flow_id(&self) -> Option<&FlowId> {
        self.flow_id.as_ref()
    }

    pub fn current_step(&self) -> Option<&str> {
        self.current_step.as_deref()
    }

    pub fn step_retries(&self) -> u32 {
        self.step_retries
    }

    pub fn data(&self) -> &Vars {
        &self.data
    }

    pub fn started_at(&self) -> &Timestamp {
        &self.started_at
    }

    pub fn last_activity_at(&self) -> &Timestamp {
        &self.last_activity_at
    }

    pub fn completed_at(&self) -> Option<&Timestamp> {
        self.completed_at.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Active session with a step waiting for an answer.
    pub fn is_in_flow(&self) -> bool {
        self.is_active() && self.flow_id.is_some() && self.current_step.is_some()
    }

    /// True once the last activity is more than `timeout_minutes` old.
    pub fn is_expired(&self, now: &Timestamp, timeout_minutes: u32) -> bool {
        now.duration_since(&self.last_activity_at) > chrono::Duration::minutes(timeout_minutes as i64)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn touch(&mut self, now: Timestamp) {
        self.last_activity_at = now;
    }

    /// Enters `flow_id` at `step`.
    pub fn begin_flow(&mut self, flow_id: FlowId, step: impl Into<String>, now: Timestamp) {
        self.flow_id = Some(flow_id);
        self.current_step = Some(step.into());
        self.step_retries = 0;
        self.last_activity_at = now;
    }

    /// Makes `step` the active step and resets the retry counter.
    pub fn move_to_step(&mut self, step: impl Into<String>, now: Timestamp) {
        self.current_step = Some(step.into());
        self.step_retries = 0;
        self.last_activity_at = now;
    }

    /// Counts one invalid answer and returns the new total.
    pub fn record_invalid_answer(&mut self, now: Timestamp) -> u32 {
        self.step_retries += 1;
        self.last_activity_at = now;
        self.step_retries
    }

    /// Stores a captured answer in the session data.
    pub fn capture(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Moves the session to a terminal status.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` (state_transition) if the session is already terminal
    pub fn finish(&mut self, status: SessionStatus, now: Timestamp) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(status)?;
        self.current_step = None;
        self.step_retries = 0;
        self.completed_at = Some(now);
        self.last_activity_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(now: Timestamp) -> ChatbotSession {
        ChatbotSession::new(TenantId::new(), ContactId::new(), "main", "+15550100", now)
    }

    #[test]
    fn new_session_is_active_and_idle() {
        let s = session(Timestamp::now());
        assert!(s.is_active());
        assert!(!s.is_in_flow());
        assert!(s.data().is_empty());
    }

    #[test]
    fn expiry_is_relative_to_last_activity() {
        let start = Timestamp::now();
        let mut s = session(start);
        assert!(!s.is_expired(&start.plus_minutes(30), 30));
        assert!(s.is_expired(&start.plus_minutes(31), 30));

        s.touch(start.plus_minutes(20));
        assert!(!s.is_expired(&start.plus_minutes(31), 30));
    }

    #[test]
    fn moving_steps_resets_retries() {
        let now = Timestamp::now();
        let mut s = session(now);
        s.begin_flow(FlowId::new(), "name", now);
        assert_eq!(s.record_invalid_answer(now), 1);
        assert_eq!(s.record_invalid_answer(now), 2);
        s.move_to_step("email", now);
        assert_eq!(s.step_retries(), 0);
        assert_eq!(s.current_step(), Some("email"));
    }

    #[test]
    fn finish_clears_step_and_stamps_completion() {
        let now = Timestamp::now();
        let mut s = session(now);
        s.begin_flow(FlowId::new(), "name", now);
        s.record_invalid_answer(now);
        s.capture("name", json!("Ana"));

        s.finish(SessionStatus::Completed, now).unwrap();

        assert_eq!(s.status(), SessionStatus::Completed);
        assert_eq!(s.current_step(), None);
        assert_eq!(s.step_retries(), 0);
        assert_eq!(s.completed_at(), Some(&now));
        assert_eq!(s.data().get("name"), Some(&json!("Ana")));
    }

    #[test]
    fn terminal_session_cannot_finish_again() {
        let now = Timestamp::now();
        let mut s = session(now);
        s.finish(SessionStatus::Timeout, now).unwrap();
        assert!(s.finish(SessionStatus::Completed, now).is_err());
        assert_eq!(s.status(), SessionStatus::Timeout);
    }

    #[test]
    fn status_state_machine() {
        assert!(SessionStatus::Active.can_transition_to(&SessionStatus::Cancelled));
        assert!(SessionStatus::Completed.is_terminal());
        assert_eq!("timeout".parse::<SessionStatus>(), Ok(SessionStatus::Timeout));
    }
}
