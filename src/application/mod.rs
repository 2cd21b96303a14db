//! Application layer - services that drive the domain through ports.
//!
//! - `cache` - TTL caches for rule sets and tenant SLA settings
//! - `keyword_matcher` - keyword rule and flow trigger selection
//! - `chatbot` - flow engine and inbound message routing
//! - `sla` - SLA deadlines and the periodic escalation processor

pub mod cache;
pub mod chatbot;
mod delivery;
pub mod keyword_matcher;
pub mod sla;

pub use cache::{RuleCache, SlaSettingsCache, TtlCache};
pub use chatbot::{
    ExitReason, FlowEngine, FlowEngineConfig, FlowOutcome, InboundMessage, InboundMessageHandler,
    InboundOutcome,
};
pub use keyword_matcher::KeywordMatcher;
pub use sla::{
    SlaProcessor, SlaProcessorConfig, SlaProcessorDeps, SlaProcessorHandle, SlaService, TickReport,
};
