//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `KeywordRuleRepository`, `FlowRepository` - tenant configuration
//! - `ChatbotSessionRepository`, `SessionMessageLog` - guided conversations
//! - `TransferRepository`, `SlaSettingsRepository` - agent hand-offs and SLA
//! - `ContactRepository`, `OutboundMessageRepository` - contacts and automated sends
//!
//! ## Collaborator Ports
//!
//! - `MessageSender` - outbound text transport
//! - `Broadcaster` - per-tenant UI notifications

mod broadcaster;
mod chatbot_session_repository;
mod contact_repository;
mod flow_repository;
mod keyword_rule_repository;
mod message_sender;
mod outbound_message_repository;
mod session_message_log;
mod sla_settings_repository;
mod transfer_repository;

pub use broadcaster::{Broadcaster, TenantEvent};
pub use chatbot_session_repository::ChatbotSessionRepository;
pub use contact_repository::ContactRepository;
pub use flow_repository::FlowRepository;
pub use keyword_rule_repository::KeywordRuleRepository;
pub use message_sender::MessageSender;
pub use outbound_message_repository::OutboundMessageRepository;
pub use session_message_log::SessionMessageLog;
pub use sla_settings_repository::SlaSettingsRepository;
pub use transfer_repository::TransferRepository;
