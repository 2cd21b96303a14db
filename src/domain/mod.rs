//! Domain layer containing the automation rules and types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine)
//! - `template` - Placeholder rendering and condition evaluation
//! - `keyword` - Keyword rules and match selection
//! - `chatbot` - Flow definitions, sessions and answer validation
//! - `sla` - Tenant SLA settings, agent transfers and inactivity decisions
//! - `messaging` - Contacts and automated outbound messages

pub mod chatbot;
pub mod foundation;
pub mod keyword;
pub mod messaging;
pub mod sla;
pub mod template;
