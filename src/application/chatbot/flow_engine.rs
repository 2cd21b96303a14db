//! FlowEngine - drives chatbot sessions through flow steps.
//!
//! Each public operation handles one event for one contact: it mutates the
//! session and contact it is given, appends every exchange to the session
//! log and persists both records before returning.

use std::sync::Arc;
use std::time::Duration;

use crate::application::delivery::send_with_timeout;
use crate::domain::chatbot::{
    validate_input, ChatbotFlow, ChatbotSession, Direction, SessionMessage, SessionStatus,
};
use crate::domain::foundation::{ContactId, DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::messaging::Contact;
use crate::domain::template::{evaluate_condition, render, stringify};
use crate::ports::{ChatbotSessionRepository, ContactRepository, MessageSender, SessionMessageLog};

/// Tunables for the flow engine.
#[derive(Debug, Clone)]
pub struct FlowEngineConfig {
    /// Inactivity after which a new session replaces the active one.
    pub session_timeout_minutes: u32,
    pub send_timeout: Duration,
}

impl Default for FlowEngineConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: 30,
            send_timeout: Duration::from_secs(10),
        }
    }
}

/// Why a flow ended without reaching its last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Cancelled,
    RetriesExhausted,
    MissingStep,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Cancelled => "cancelled",
            ExitReason::RetriesExhausted => "retries_exhausted",
            ExitReason::MissingStep => "missing_step",
        }
    }
}

/// Result of driving a session by one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// A step prompt was sent and the session waits on it.
    Prompted { step: String },
    /// The answer was invalid and the step was asked again.
    Retrying { step: String, attempt: u32 },
    Completed,
    Exited(ExitReason),
}

pub struct FlowEngine {
    sessions: Arc<dyn ChatbotSessionRepository>,
    message_log: Arc<dyn SessionMessageLog>,
    contacts: Arc<dyn ContactRepository>,
    sender: Arc<dyn MessageSender>,
    config: FlowEngineConfig,
}

impl FlowEngine {
    pub fn new(
        sessions: Arc<dyn ChatbotSessionRepository>,
        message_log: Arc<dyn SessionMessageLog>,
        contacts: Arc<dyn ContactRepository>,
        sender: Arc<dyn MessageSender>,
        config: FlowEngineConfig,
    ) -> Self {
        Self {
            sessions,
            message_log,
            contacts,
            sender,
            config,
        }
    }

    pub fn config(&self) -> &FlowEngineConfig {
        &self.config
    }

    /// Returns the contact's active session if it was used within
    /// `timeout_minutes`, otherwise creates and stores a new one.
    ///
    /// A stale session is left untouched. The flag is true for new sessions.
    pub async fn get_or_create_session(
        &self,
        tenant_id: &TenantId,
        contact_id: &ContactId,
        account: &str,
        phone: &str,
        timeout_minutes: u32,
        now: Timestamp,
    ) -> Result<(ChatbotSession, bool), DomainError> {
        if let Some(session) = self
            .sessions
            .find_active(tenant_id, contact_id, account)
            .await?
        {
            if !session.is_expired(&now, timeout_minutes) {
                return Ok((session, false));
            }
            tracing::debug!(
                session_id = %session.id(),
                contact_id = %contact_id,
                "Active session is stale, starting a new one"
            );
        }

        let session = ChatbotSession::new(*tenant_id, *contact_id, account, phone, now);
        self.sessions.insert(&session).await?;
        Ok((session, true))
    }

    /// Stamps activity on a session whose message was handled outside a flow
    /// and stores it together with the contact.
    pub async fn record_activity(
        &self,
        session: &mut ChatbotSession,
        contact: &Contact,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        session.touch(now);
        self.persist(session, contact).await
    }

    /// Enters `flow` at its first step and sends that step's prompt.
    ///
    /// A flow without steps completes immediately.
    pub async fn start_flow(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        flow: &ChatbotFlow,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        ensure_active(session)?;

        let outcome = match flow.first_step() {
            None => self.finish_completed(account, session, contact, flow, now).await?,
            Some(first) => {
                tracing::info!(
                    session_id = %session.id(),
                    flow_id = %flow.id,
                    flow = %flow.name,
                    "Starting flow"
                );
                let first = first.name.clone();
                session.begin_flow(flow.id, first.as_str(), now);
                self.enter_step(account, session, contact, flow, first, now)
                    .await?
            }
        };

        self.persist(session, contact).await?;
        Ok(outcome)
    }

    /// Feeds one inbound message to the session's current step.
    pub async fn handle_input(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        flow: &ChatbotFlow,
        text: &str,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        let Some(step_name) = session.current_step().map(str::to_string) else {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Session {} has no step awaiting input", session.id()),
            ));
        };

        self.log(session, Direction::Inbound, text, Some(&step_name), now)
            .await?;
        contact.record_inbound(now);
        session.touch(now);

        let outcome = self
            .advance(account, session, contact, flow, &step_name, text, now)
            .await?;

        self.persist(session, contact).await?;
        Ok(outcome)
    }

    /// Sends the rendered completion message and marks the session completed.
    pub async fn complete_flow(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        flow: &ChatbotFlow,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        let outcome = self
            .finish_completed(account, session, contact, flow, now)
            .await?;
        self.persist(session, contact).await?;
        Ok(outcome)
    }

    /// Ends the flow early. The session is stored as completed and the
    /// reason is kept in the session log.
    pub async fn exit_flow(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        reason: ExitReason,
        farewell: Option<&str>,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        let outcome = self
            .finish_exited(account, session, contact, reason, farewell, now)
            .await?;
        self.persist(session, contact).await?;
        Ok(outcome)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Step handling
    // ─────────────────────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    async fn advance(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        flow: &ChatbotFlow,
        step_name: &str,
        text: &str,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        if flow.is_cancel_keyword(text) {
            let farewell = flow.cancel_message.as_deref();
            return self
                .finish_exited(account, session, contact, ExitReason::Cancelled, farewell, now)
                .await;
        }

        let Some(step) = flow.step(step_name) else {
            tracing::warn!(session_id = %session.id(), step = step_name, "Current step no longer exists");
            return self
                .finish_exited(account, session, contact, ExitReason::MissingStep, None, now)
                .await;
        };

        // A step that became skippable while waiting is left without capturing
        // the text; the message is logged only and the next step is prompted.
        if is_skipped(step.skip_condition.as_deref(), session) {
            return match step.next_when_skipped() {
                Some(next) => {
                    self.enter_step(account, session, contact, flow, next.to_string(), now)
                        .await
                }
                None => self.finish_completed(account, session, contact, flow, now).await,
            };
        }

        match validate_input(step, text) {
            Ok(value) => {
                let next = step.next_for(&stringify(&value)).map(str::to_string);
                if let Some(key) = &step.store_as {
                    session.capture(key.as_str(), value);
                }
                match next {
                    Some(next) => {
                        self.enter_step(account, session, contact, flow, next, now)
                            .await
                    }
                    None => self.finish_completed(account, session, contact, flow, now).await,
                }
            }
            Err(rejection) => {
                let attempt = session.record_invalid_answer(now);
                tracing::debug!(
                    session_id = %session.id(),
                    step = %step.name,
                    attempt,
                    reason = %rejection,
                    "Answer rejected"
                );

                if step.retry_on_invalid && attempt < step.max_retries {
                    let prompt = step.retry_prompt(session.data());
                    self.say(account, session, contact, &prompt, Some(&step.name), now)
                        .await?;
                    return Ok(FlowOutcome::Retrying {
                        step: step.name.clone(),
                        attempt,
                    });
                }

                let farewell = flow.timeout_message.as_deref();
                self.finish_exited(
                    account,
                    session,
                    contact,
                    ExitReason::RetriesExhausted,
                    farewell,
                    now,
                )
                .await
            }
        }
    }

    /// Makes `name` the current step, skipping steps whose condition holds,
    /// and prompts for the first step that is not skipped.
    async fn enter_step(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        flow: &ChatbotFlow,
        mut name: String,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        // Each step can be skipped at most once per entry.
        for _ in 0..=flow.steps.len() {
            let Some(step) = flow.step(&name) else {
                tracing::warn!(session_id = %session.id(), step = %name, "Flow points to a missing step");
                return self
                    .finish_exited(account, session, contact, ExitReason::MissingStep, None, now)
                    .await;
            };

            if is_skipped(step.skip_condition.as_deref(), session) {
                match step.next_when_skipped() {
                    Some(next) => {
                        name = next.to_string();
                        continue;
                    }
                    None => {
                        return self.finish_completed(account, session, contact, flow, now).await
                    }
                }
            }

            session.move_to_step(step.name.as_str(), now);
            let prompt = step.prompt(session.data());
            self.say(account, session, contact, &prompt, Some(&step.name), now)
                .await?;
            return Ok(FlowOutcome::Prompted {
                step: step.name.clone(),
            });
        }

        tracing::warn!(session_id = %session.id(), flow_id = %flow.id, "Skip conditions form a cycle");
        self.finish_exited(account, session, contact, ExitReason::MissingStep, None, now)
            .await
    }

    async fn finish_completed(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        flow: &ChatbotFlow,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        if let Some(template) = &flow.completion_message {
            let text = render(template, session.data());
            if !text.trim().is_empty() {
                self.send(account, session, &text, None, now).await?;
            }
        }

        session.finish(SessionStatus::Completed, now)?;
        contact.clear_chatbot_wait();
        tracing::info!(session_id = %session.id(), flow_id = %flow.id, "Flow completed");
        Ok(FlowOutcome::Completed)
    }

    async fn finish_exited(
        &self,
        account: &str,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        reason: ExitReason,
        farewell: Option<&str>,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        if let Some(template) = farewell {
            let text = render(template, session.data());
            if !text.trim().is_empty() {
                self.send(account, session, &text, None, now).await?;
            }
        }

        let step = session.current_step().map(str::to_string);
        self.log(session, Direction::System, reason.as_str(), step.as_deref(), now)
            .await?;

        session.finish(SessionStatus::Completed, now)?;
        contact.clear_chatbot_wait();
        tracing::info!(session_id = %session.id(), reason = reason.as_str(), "Flow exited");
        Ok(FlowOutcome::Exited(reason))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messaging and persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Sends a prompt that expects an answer.
    async fn say(
        &self,
        account: &str,
        session: &ChatbotSession,
        contact: &mut Contact,
        text: &str,
        step: Option<&str>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.send(account, session, text, step, now).await?;
        contact.record_chatbot_prompt(now);
        Ok(())
    }

    /// Logs and sends `text`. Transport failures are logged, not returned.
    async fn send(
        &self,
        account: &str,
        session: &ChatbotSession,
        text: &str,
        step: Option<&str>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.log(session, Direction::Outbound, text, step, now).await?;

        if let Err(err) = send_with_timeout(
            self.sender.as_ref(),
            self.config.send_timeout,
            account,
            session.phone(),
            text,
        )
        .await
        {
            tracing::warn!(
                session_id = %session.id(),
                error = %err,
                "Failed to send chatbot message"
            );
        }
        Ok(())
    }

    async fn log(
        &self,
        session: &ChatbotSession,
        direction: Direction,
        body: &str,
        step: Option<&str>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let entry = SessionMessage::new(*session.id(), direction, body, step, now);
        self.message_log.append(&entry).await
    }

    async fn persist(&self, session: &ChatbotSession, contact: &Contact) -> Result<(), DomainError> {
        self.sessions.update(session).await?;
        self.contacts.update(contact).await
    }
}

fn ensure_active(session: &ChatbotSession) -> Result<(), DomainError> {
    if session.is_active() {
        Ok(())
    } else {
        Err(DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!("Session {} is {}", session.id(), session.status().as_str()),
        ))
    }
}

fn is_skipped(condition: Option<&str>, session: &ChatbotSession) -> bool {
    condition.is_some_and(|c| !c.trim().is_empty() && evaluate_condition(c, session.data()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryChatbotSessionRepository, InMemoryContactRepository, InMemorySessionMessageLog,
        RecordingSender,
    };
    use crate::domain::chatbot::{FlowStep, InputType};
    use serde_json::json;

    const PHONE: &str = "+15550100";

    struct Fixture {
        sessions: Arc<InMemoryChatbotSessionRepository>,
        log: Arc<InMemorySessionMessageLog>,
        contacts: Arc<InMemoryContactRepository>,
        sender: Arc<RecordingSender>,
        engine: FlowEngine,
        tenant: TenantId,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(InMemoryChatbotSessionRepository::new());
        let log = Arc::new(InMemorySessionMessageLog::new());
        let contacts = Arc::new(InMemoryContactRepository::new());
        let sender = Arc::new(RecordingSender::new());
        let engine = FlowEngine::new(
            sessions.clone(),
            log.clone(),
            contacts.clone(),
            sender.clone(),
            FlowEngineConfig::default(),
        );
        Fixture {
            sessions,
            log,
            contacts,
            sender,
            engine,
            tenant: TenantId::new(),
        }
    }

    impl Fixture {
        async fn contact_and_session(&self, now: Timestamp) -> (Contact, ChatbotSession) {
            let contact = Contact::new(self.tenant, "main", PHONE);
            self.contacts.save(&contact).await.unwrap();
            let (session, _) = self
                .engine
                .get_or_create_session(&self.tenant, &contact.id, "main", PHONE, 30, now)
                .await
                .unwrap();
            (contact, session)
        }
    }

    fn signup(tenant: TenantId) -> ChatbotFlow {
        ChatbotFlow::new(tenant, "main", "signup")
            .triggered_by(["join"])
            .cancelled_by(["stop"])
            .completing_with("Thanks {{name}}, you are {{age}}!")
            .timing_out_with("Let's try again later.")
            .with_step(FlowStep::new("name", 1, "What's your name?").storing_as("name").then("age"))
            .with_step(
                FlowStep::new("age", 2, "How old are you?")
                    .with_input(InputType::Number)
                    .storing_as("age")
                    .with_retries(2, true),
            )
    }

    #[tokio::test]
    async fn session_is_reused_within_timeout() {
        let f = fixture();
        let now = Timestamp::now();
        let contact = ContactId::new();

        let (first, new_first) = f
            .engine
            .get_or_create_session(&f.tenant, &contact, "main", PHONE, 30, now)
            .await
            .unwrap();
        let (second, new_second) = f
            .engine
            .get_or_create_session(&f.tenant, &contact, "main", PHONE, 30, now.plus_minutes(10))
            .await
            .unwrap();

        assert!(new_first);
        assert!(!new_second);
        assert_eq!(first.id(), second.id());
    }

    #[tokio::test]
    async fn stale_session_is_replaced_but_not_touched() {
        let f = fixture();
        let now = Timestamp::now();
        let contact = ContactId::new();

        let (first, _) = f
            .engine
            .get_or_create_session(&f.tenant, &contact, "main", PHONE, 30, now)
            .await
            .unwrap();
        let (second, is_new) = f
            .engine
            .get_or_create_session(&f.tenant, &contact, "main", PHONE, 30, now.plus_minutes(31))
            .await
            .unwrap();

        assert!(is_new);
        assert_ne!(first.id(), second.id());
        let stale = f.sessions.find_by_id(first.id()).await.unwrap().unwrap();
        assert_eq!(stale, first);
        assert_eq!(f.sessions.count().await, 2);
    }

    #[tokio::test]
    async fn zero_step_flow_completes_immediately() {
        let f = fixture();
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;
        let flow = ChatbotFlow::new(f.tenant, "main", "empty").completing_with("All done");

        let outcome = f
            .engine
            .start_flow("main", &mut session, &mut contact, &flow, now)
            .await
            .unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.current_step().is_none());
        assert_eq!(f.sender.sent_to(PHONE).await, vec!["All done".to_string()]);
    }

    #[tokio::test]
    async fn flow_captures_answers_and_completes() {
        let f = fixture();
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;
        let flow = signup(f.tenant);

        let started = f
            .engine
            .start_flow("main", &mut session, &mut contact, &flow, now)
            .await
            .unwrap();
        assert_eq!(started, FlowOutcome::Prompted { step: "name".into() });
        assert!(contact.is_awaiting_reply());

        let at = now.plus_secs(5);
        let next = f
            .engine
            .handle_input("main", &mut session, &mut contact, &flow, "Ana", at)
            .await
            .unwrap();
        assert_eq!(next, FlowOutcome::Prompted { step: "age".into() });

        let done = f
            .engine
            .handle_input("main", &mut session, &mut contact, &flow, "41", at.plus_secs(5))
            .await
            .unwrap();
        assert_eq!(done, FlowOutcome::Completed);
        assert_eq!(session.data().get("age"), Some(&json!(41)));
        assert!(!contact.is_awaiting_reply());

        let sent = f.sender.sent_to(PHONE).await;
        assert_eq!(sent.last().map(String::as_str), Some("Thanks Ana, you are 41!"));

        let stored = f.sessions.find_by_id(session.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), SessionStatus::Completed);

        let history = f.log.list(session.id()).await.unwrap();
        let directions: Vec<_> = history.iter().map(|m| m.direction).collect();
        assert_eq!(
            directions,
            vec![
                Direction::Outbound,
                Direction::Inbound,
                Direction::Outbound,
                Direction::Inbound,
                Direction::Outbound,
            ]
        );
        assert_eq!(history[1].step_name.as_deref(), Some("name"));
    }

    #[tokio::test]
    async fn invalid_answer_retries_then_exits() {
        let f = fixture();
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;
        let flow = signup(f.tenant);

        f.engine
            .start_flow("main", &mut session, &mut contact, &flow, now)
            .await
            .unwrap();
        f.engine
            .handle_input("main", &mut session, &mut contact, &flow, "Ana", now)
            .await
            .unwrap();

        let retry = f
            .engine
            .handle_input("main", &mut session, &mut contact, &flow, "old", now)
            .await
            .unwrap();
        assert_eq!(
            retry,
            FlowOutcome::Retrying {
                step: "age".into(),
                attempt: 1
            }
        );

        let exited = f
            .engine
            .handle_input("main", &mut session, &mut contact, &flow, "older", now)
            .await
            .unwrap();
        assert_eq!(exited, FlowOutcome::Exited(ExitReason::RetriesExhausted));
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.step_retries(), 0);
        assert_eq!(
            f.sender.sent_to(PHONE).await.last().map(String::as_str),
            Some("Let's try again later.")
        );

        let history = f.log.list(session.id()).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.direction, Direction::System);
        assert_eq!(last.body, "retries_exhausted");
    }

    #[tokio::test]
    async fn cancel_keyword_exits_flow() {
        let f = fixture();
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;
        let mut flow = signup(f.tenant);
        flow.cancel_message = Some("Cancelled.".into());

        f.engine
            .start_flow("main", &mut session, &mut contact, &flow, now)
            .await
            .unwrap();
        let outcome = f
            .engine
            .handle_input("main", &mut session, &mut contact, &flow, " STOP ", now)
            .await
            .unwrap();

        assert_eq!(outcome, FlowOutcome::Exited(ExitReason::Cancelled));
        assert!(session.data().is_empty());
        assert_eq!(
            f.sender.sent_to(PHONE).await.last().map(String::as_str),
            Some("Cancelled.")
        );
    }

    #[tokio::test]
    async fn conditional_branch_and_skip_on_entry() {
        let f = fixture();
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;
        session.capture("vip", json!(true));
        let flow = ChatbotFlow::new(f.tenant, "main", "support")
            .with_step(
                FlowStep::new("topic", 1, "Sales or support?")
                    .with_input(InputType::Select)
                    .with_options(["Sales", "Support"])
                    .storing_as("topic")
                    .branch("Sales", "budget")
                    .branch("default", "issue"),
            )
            .with_step(FlowStep::new("budget", 2, "Budget?").skip_when("vip").then("issue"))
            .with_step(FlowStep::new("issue", 3, "Describe the issue"));

        f.engine
            .start_flow("main", &mut session, &mut contact, &flow, now)
            .await
            .unwrap();
        let outcome = f
            .engine
            .handle_input("main", &mut session, &mut contact, &flow, "1", now)
            .await
            .unwrap();

        assert_eq!(outcome, FlowOutcome::Prompted { step: "issue".into() });
        assert_eq!(session.data().get("topic"), Some(&json!("Sales")));
    }

    #[tokio::test]
    async fn step_skipped_while_waiting_logs_text_without_capturing_it() {
        let f = fixture();
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;
        let flow = ChatbotFlow::new(f.tenant, "main", "support")
            .with_step(
                FlowStep::new("plan", 1, "Which plan are you on?")
                    .storing_as("plan")
                    .skip_when("vip")
                    .then("issue"),
            )
            .with_step(FlowStep::new("issue", 2, "Describe the issue"));

        f.engine
            .start_flow("main", &mut session, &mut contact, &flow, now)
            .await
            .unwrap();
        session.capture("vip", json!(true));

        let outcome = f
            .engine
            .handle_input("main", &mut session, &mut contact, &flow, "premium", now)
            .await
            .unwrap();

        assert_eq!(outcome, FlowOutcome::Prompted { step: "issue".into() });
        assert!(session.data().get("plan").is_none());
        assert_eq!(
            f.sender.sent_to(PHONE).await.last().map(String::as_str),
            Some("Describe the issue")
        );
        let inbound: Vec<_> = f
            .log
            .list(session.id())
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.direction == Direction::Inbound)
            .map(|m| (m.body, m.step_name))
            .collect();
        assert_eq!(inbound, vec![("premium".to_string(), Some("plan".to_string()))]);
    }

    #[tokio::test]
    async fn send_failure_does_not_stop_flow() {
        let f = fixture();
        f.sender.fail_for(PHONE).await;
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;

        let outcome = f
            .engine
            .start_flow("main", &mut session, &mut contact, &signup(f.tenant), now)
            .await
            .unwrap();

        assert_eq!(outcome, FlowOutcome::Prompted { step: "name".into() });
        assert_eq!(f.log.list(session.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn input_without_current_step_is_rejected() {
        let f = fixture();
        let now = Timestamp::now();
        let (mut contact, mut session) = f.contact_and_session(now).await;

        let err = f
            .engine
            .handle_input("main", &mut session, &mut contact, &signup(f.tenant), "hi", now)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }
}
