//! Chatbot orchestration: the flow engine and inbound message routing.

mod flow_engine;
mod inbound;

pub use flow_engine::{ExitReason, FlowEngine, FlowEngineConfig, FlowOutcome};
pub use inbound::{InboundMessage, InboundMessageHandler, InboundOutcome};
