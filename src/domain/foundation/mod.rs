//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and error
//! types that form the vocabulary of the automation engine.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    AgentId, ContactId, FlowId, MessageId, RuleId, SessionId, TeamId, TenantId, TransferId,
};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
