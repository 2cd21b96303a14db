//! SLA settings, agent transfers and client inactivity rules.

mod inactivity;
mod settings;
mod transfer;

pub use inactivity::{inactivity_action, InactivityAction};
pub use settings::{SlaSettings, DEFAULT_INACTIVITY_CLOSE_MESSAGE, DEFAULT_REMINDER_MESSAGE};
pub use transfer::{
    AgentTransfer, EscalationOutcome, SlaTracking, TransferSource, TransferStatus,
    CRITICAL_ESCALATION_LEVEL,
};
