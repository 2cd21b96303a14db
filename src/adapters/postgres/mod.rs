//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! Queries are runtime-checked (`sqlx::query` + `bind`) against the schema
//! in `migrations/`. Enum columns are stored as their lowercase names and
//! JSON documents (session data, flow steps, buttons) as JSONB.

mod chatbot_session_repository;
mod contact_repository;
mod flow_repository;
mod keyword_rule_repository;
mod outbound_message_repository;
mod sla_settings_repository;
mod support;
mod transfer_repository;

pub use chatbot_session_repository::{PostgresChatbotSessionRepository, PostgresSessionMessageLog};
pub use contact_repository::PostgresContactRepository;
pub use flow_repository::PostgresFlowRepository;
pub use keyword_rule_repository::PostgresKeywordRuleRepository;
pub use outbound_message_repository::PostgresOutboundMessageRepository;
pub use sla_settings_repository::PostgresSlaSettingsRepository;
pub use transfer_repository::PostgresTransferRepository;
