//! InboundMessageHandler - routes a parsed inbound message.
//!
//! Order of precedence: a session already inside a flow gets the message as
//! step input, then flow triggers, then keyword rules.

use std::sync::Arc;

use crate::application::delivery::send_with_timeout;
use crate::application::keyword_matcher::KeywordMatcher;
use crate::domain::chatbot::{ChatbotFlow, ChatbotSession};
use crate::domain::foundation::{ContactId, DomainError, ErrorCode, FlowId, RuleId, TenantId, Timestamp};
use crate::domain::keyword::KeywordAction;
use crate::domain::messaging::Contact;
use crate::ports::{ContactRepository, FlowRepository, MessageSender};

use super::flow_engine::{ExitReason, FlowEngine, FlowOutcome};

/// Inbound message as delivered by webhook ingestion.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub tenant_id: TenantId,
    pub contact_id: ContactId,
    pub account: String,
    pub phone: String,
    pub text: String,
}

/// What the handler did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Flow(FlowOutcome),
    Replied { rule_id: RuleId },
    /// The matched rule hands the conversation to a human; the caller opens
    /// the transfer.
    TransferRequested { rule_id: RuleId, note: String },
    NoMatch,
}

pub struct InboundMessageHandler {
    matcher: Arc<KeywordMatcher>,
    engine: Arc<FlowEngine>,
    flows: Arc<dyn FlowRepository>,
    contacts: Arc<dyn ContactRepository>,
    sender: Arc<dyn MessageSender>,
}

impl InboundMessageHandler {
    pub fn new(
        matcher: Arc<KeywordMatcher>,
        engine: Arc<FlowEngine>,
        flows: Arc<dyn FlowRepository>,
        contacts: Arc<dyn ContactRepository>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            matcher,
            engine,
            flows,
            contacts,
            sender,
        }
    }

    pub async fn handle(
        &self,
        msg: InboundMessage,
        now: Timestamp,
    ) -> Result<InboundOutcome, DomainError> {
        let mut contact = self
            .contacts
            .find_by_id(&msg.tenant_id, &msg.contact_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ContactNotFound,
                    format!("Contact {} not found", msg.contact_id),
                )
            })?;

        let timeout = self.engine.config().session_timeout_minutes;
        let (mut session, _) = self
            .engine
            .get_or_create_session(
                &msg.tenant_id,
                &msg.contact_id,
                &msg.account,
                &msg.phone,
                timeout,
                now,
            )
            .await?;

        // 1. Continue the flow in progress
        if session.is_in_flow() {
            return self
                .continue_flow(&msg, &mut session, &mut contact, now)
                .await
                .map(InboundOutcome::Flow);
        }

        // Every message outside a flow keeps the session alive.
        session.touch(now);
        contact.record_inbound(now);

        // 2. Flow trigger keywords
        if let Some(flow) = self
            .matcher
            .match_flow_trigger(&msg.tenant_id, &msg.account, &msg.text)
            .await?
        {
            return self
                .engine
                .start_flow(&msg.account, &mut session, &mut contact, &flow, now)
                .await
                .map(InboundOutcome::Flow);
        }

        // 3. Keyword rules
        let Some(matched) = self
            .matcher
            .match_at(&msg.tenant_id, &msg.account, &msg.text, &now)
            .await?
        else {
            self.engine.record_activity(&mut session, &contact, now).await?;
            return Ok(InboundOutcome::NoMatch);
        };

        match matched.action() {
            KeywordAction::StartFlow(flow_id) => {
                let Some(flow) = self.load_flow(&msg.tenant_id, &flow_id).await? else {
                    tracing::warn!(rule_id = %matched.rule_id, flow_id = %flow_id, "Rule points to a missing flow");
                    self.engine.record_activity(&mut session, &contact, now).await?;
                    return Ok(InboundOutcome::NoMatch);
                };
                self.engine
                    .start_flow(&msg.account, &mut session, &mut contact, &flow, now)
                    .await
                    .map(InboundOutcome::Flow)
            }
            KeywordAction::Reply { body, buttons } => {
                self.reply(&msg, &with_buttons(&body, &buttons)).await;
                self.engine.record_activity(&mut session, &contact, now).await?;
                Ok(InboundOutcome::Replied {
                    rule_id: matched.rule_id,
                })
            }
            KeywordAction::SendMedia { url, caption } => {
                let text = if caption.trim().is_empty() {
                    url
                } else {
                    format!("{}\n{}", caption, url)
                };
                self.reply(&msg, &text).await;
                self.engine.record_activity(&mut session, &contact, now).await?;
                Ok(InboundOutcome::Replied {
                    rule_id: matched.rule_id,
                })
            }
            KeywordAction::TransferToAgent { note } => {
                if !note.trim().is_empty() {
                    self.reply(&msg, &note).await;
                }
                self.engine.record_activity(&mut session, &contact, now).await?;
                Ok(InboundOutcome::TransferRequested {
                    rule_id: matched.rule_id,
                    note,
                })
            }
        }
    }

    async fn continue_flow(
        &self,
        msg: &InboundMessage,
        session: &mut ChatbotSession,
        contact: &mut Contact,
        now: Timestamp,
    ) -> Result<FlowOutcome, DomainError> {
        let flow = match session.flow_id().copied() {
            Some(flow_id) => self.load_flow(&msg.tenant_id, &flow_id).await?,
            None => None,
        };

        match flow {
            Some(flow) => {
                self.engine
                    .handle_input(&msg.account, session, contact, &flow, &msg.text, now)
                    .await
            }
            None => {
                tracing::warn!(session_id = %session.id(), "Session flow no longer exists");
                contact.record_inbound(now);
                self.engine
                    .exit_flow(&msg.account, session, contact, ExitReason::MissingStep, None, now)
                    .await
            }
        }
    }

    async fn load_flow(
        &self,
        tenant_id: &TenantId,
        flow_id: &FlowId,
    ) -> Result<Option<ChatbotFlow>, DomainError> {
        Ok(self
            .flows
            .find_by_id(tenant_id, flow_id)
            .await?
            .filter(|flow| flow.enabled))
    }

    async fn reply(&self, msg: &InboundMessage, text: &str) {
        let timeout = self.engine.config().send_timeout;
        if let Err(err) =
            send_with_timeout(self.sender.as_ref(), timeout, &msg.account, &msg.phone, text).await
        {
            tracing::warn!(
                tenant_id = %msg.tenant_id,
                contact_id = %msg.contact_id,
                error = %err,
                "Failed to send keyword reply"
            );
        }
    }
}

fn with_buttons(body: &str, buttons: &[String]) -> String {
    let mut text = body.to_string();
    for (i, button) in buttons.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, button));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryChatbotSessionRepository, InMemoryContactRepository, InMemoryFlowRepository,
        InMemoryKeywordRuleRepository, InMemorySessionMessageLog, RecordingSender,
    };
    use crate::application::cache::RuleCache;
    use crate::application::chatbot::FlowEngineConfig;
    use crate::domain::chatbot::FlowStep;
    use crate::domain::keyword::{KeywordRule, MatchType, ResponseKind, RuleResponse};
    use crate::ports::{ChatbotSessionRepository, KeywordRuleRepository};
    use std::time::Duration;

    const PHONE: &str = "+15550100";

    struct Fixture {
        rules: Arc<InMemoryKeywordRuleRepository>,
        flows: Arc<InMemoryFlowRepository>,
        contacts: Arc<InMemoryContactRepository>,
        sessions: Arc<InMemoryChatbotSessionRepository>,
        sender: Arc<RecordingSender>,
        handler: InboundMessageHandler,
        tenant: TenantId,
    }

    fn fixture() -> Fixture {
        fixture_with(FlowEngineConfig::default())
    }

    fn fixture_with(config: FlowEngineConfig) -> Fixture {
        let rules = Arc::new(InMemoryKeywordRuleRepository::new());
        let flows = Arc::new(InMemoryFlowRepository::new());
        let contacts = Arc::new(InMemoryContactRepository::new());
        let sessions = Arc::new(InMemoryChatbotSessionRepository::new());
        let sender = Arc::new(RecordingSender::new());
        let cache = Arc::new(RuleCache::new(
            rules.clone(),
            flows.clone(),
            Duration::from_secs(60),
        ));
        let engine = Arc::new(FlowEngine::new(
            sessions.clone(),
            Arc::new(InMemorySessionMessageLog::new()),
            contacts.clone(),
            sender.clone(),
            config,
        ));
        let handler = InboundMessageHandler::new(
            Arc::new(KeywordMatcher::new(cache)),
            engine,
            flows.clone(),
            contacts.clone(),
            sender.clone(),
        );
        Fixture {
            rules,
            flows,
            contacts,
            sessions,
            sender,
            handler,
            tenant: TenantId::new(),
        }
    }

    impl Fixture {
        async fn contact(&self) -> Contact {
            let contact = Contact::new(self.tenant, "main", PHONE);
            self.contacts.save(&contact).await.unwrap();
            contact
        }

        fn message(&self, contact: &Contact, text: &str) -> InboundMessage {
            InboundMessage {
                tenant_id: self.tenant,
                contact_id: contact.id,
                account: "main".into(),
                phone: PHONE.into(),
                text: text.into(),
            }
        }
    }

    #[tokio::test]
    async fn keyword_reply_lists_buttons() {
        let f = fixture();
        let contact = f.contact().await;
        let mut response = RuleResponse::text("Pick one");
        response.buttons = vec!["Yes".into(), "No".into()];
        let rule = KeywordRule::new(
            f.tenant,
            "main",
            "menu",
            vec!["menu".into()],
            MatchType::Exact,
            response,
        )
        .unwrap();
        f.rules.save(&rule).await.unwrap();

        let outcome = f
            .handler
            .handle(f.message(&contact, "MENU"), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(outcome, InboundOutcome::Replied { rule_id: rule.id });
        assert_eq!(
            f.sender.sent_to(PHONE).await,
            vec!["Pick one\n1. Yes\n2. No".to_string()]
        );
    }

    #[tokio::test]
    async fn trigger_starts_flow_and_next_message_answers_it() {
        let f = fixture();
        let contact = f.contact().await;
        let flow = ChatbotFlow::new(f.tenant, "main", "feedback")
            .triggered_by(["feedback"])
            .completing_with("Thanks!")
            .with_step(FlowStep::new("comment", 1, "Tell us more").storing_as("comment"));
        f.flows.save(&flow).await.unwrap();

        let now = Timestamp::now();
        let first = f
            .handler
            .handle(f.message(&contact, "Feedback"), now)
            .await
            .unwrap();
        let second = f
            .handler
            .handle(f.message(&contact, "Great service"), now.plus_secs(30))
            .await
            .unwrap();

        assert_eq!(
            first,
            InboundOutcome::Flow(FlowOutcome::Prompted {
                step: "comment".into()
            })
        );
        assert_eq!(second, InboundOutcome::Flow(FlowOutcome::Completed));
        assert_eq!(
            f.sender.sent_to(PHONE).await,
            vec!["Tell us more".to_string(), "Thanks!".to_string()]
        );
    }

    #[tokio::test]
    async fn flow_rule_starts_referenced_flow() {
        let f = fixture();
        let contact = f.contact().await;
        let flow = ChatbotFlow::new(f.tenant, "main", "booking")
            .with_step(FlowStep::new("date", 1, "Which day?"));
        f.flows.save(&flow).await.unwrap();

        let mut response = RuleResponse::text("");
        response.kind = ResponseKind::Flow;
        response.flow_id = Some(flow.id);
        let rule = KeywordRule::new(
            f.tenant,
            "main",
            "book",
            vec!["book".into()],
            MatchType::StartsWith,
            response,
        )
        .unwrap();
        f.rules.save(&rule).await.unwrap();

        let outcome = f
            .handler
            .handle(f.message(&contact, "book a table"), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            InboundOutcome::Flow(FlowOutcome::Prompted { step: "date".into() })
        );
    }

    #[tokio::test]
    async fn unmatched_message_records_inbound_time() {
        let f = fixture();
        let contact = f.contact().await;
        let now = Timestamp::now();

        let outcome = f
            .handler
            .handle(f.message(&contact, "anything"), now)
            .await
            .unwrap();

        assert_eq!(outcome, InboundOutcome::NoMatch);
        let stored = f
            .contacts
            .find_by_id(&f.tenant, &contact.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_message_at, Some(now));
        assert!(f.sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn keyword_conversation_stays_in_one_session() {
        let f = fixture();
        let contact = f.contact().await;
        let rule = KeywordRule::new(
            f.tenant,
            "main",
            "greeting",
            vec!["hi".into()],
            MatchType::Exact,
            RuleResponse::text("Hello!"),
        )
        .unwrap();
        f.rules.save(&rule).await.unwrap();
        let now = Timestamp::now();

        for minutes in [0, 20, 40] {
            let outcome = f
                .handler
                .handle(f.message(&contact, "hi"), now.plus_minutes(minutes))
                .await
                .unwrap();
            assert_eq!(outcome, InboundOutcome::Replied { rule_id: rule.id });
        }
        f.handler
            .handle(f.message(&contact, "anything else"), now.plus_minutes(65))
            .await
            .unwrap();

        assert_eq!(f.sessions.count().await, 1);
        let session = f
            .sessions
            .find_active(&f.tenant, &contact.id, "main")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.last_activity_at(), &now.plus_minutes(65));
    }

    #[tokio::test]
    async fn configured_session_timeout_decides_when_a_session_is_replaced() {
        let f = fixture_with(FlowEngineConfig {
            session_timeout_minutes: 5,
            ..FlowEngineConfig::default()
        });
        let contact = f.contact().await;
        let now = Timestamp::now();

        for minutes in [0, 4] {
            f.handler
                .handle(f.message(&contact, "hello"), now.plus_minutes(minutes))
                .await
                .unwrap();
        }
        assert_eq!(f.sessions.count().await, 1);

        f.handler
            .handle(f.message(&contact, "hello"), now.plus_minutes(10))
            .await
            .unwrap();
        assert_eq!(f.sessions.count().await, 2);
    }

    #[tokio::test]
    async fn unknown_contact_is_an_error() {
        let f = fixture();
        let ghost = Contact::new(f.tenant, "main", PHONE);

        let err = f
            .handler
            .handle(f.message(&ghost, "hi"), Timestamp::now())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ContactNotFound);
    }
}
