//! In-memory adapters for every port.
//!
//! State lives in `tokio::sync::RwLock`-guarded maps, so these adapters are
//! usable from tests and single-process runs alike. Nothing is persisted.

mod broadcaster;
mod contacts;
mod flows;
mod keyword_rules;
mod outbound_messages;
mod sender;
mod sessions;
mod sla_settings;
mod transfers;

pub use broadcaster::InMemoryBroadcaster;
pub use contacts::InMemoryContactRepository;
pub use flows::InMemoryFlowRepository;
pub use keyword_rules::InMemoryKeywordRuleRepository;
pub use outbound_messages::InMemoryOutboundMessageRepository;
pub use sender::{RecordingSender, SentText};
pub use sessions::{InMemoryChatbotSessionRepository, InMemorySessionMessageLog};
pub use sla_settings::InMemorySlaSettingsRepository;
pub use transfers::InMemoryTransferRepository;
