//! Chatbot-relevant view of a contact.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ContactId, TenantId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub tenant_id: TenantId,
    pub account: String,
    pub phone: String,
    pub name: Option<String>,
    /// Last inbound message from the contact.
    pub last_message_at: Option<Timestamp>,
    /// Last chatbot message still waiting for a reply.
    pub chatbot_last_message_at: Option<Timestamp>,
    pub chatbot_reminder_sent: bool,
}

impl Contact {
    pub fn new(tenant_id: TenantId, account: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: ContactId::new(),
            tenant_id,
            account: account.into(),
            phone: phone.into(),
            name: None,
            last_message_at: None,
            chatbot_last_message_at: None,
            chatbot_reminder_sent: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The chatbot spoke last and the contact has not answered since.
    pub fn is_awaiting_reply(&self) -> bool {
        match (self.chatbot_last_message_at, self.last_message_at) {
            (Some(bot), Some(contact)) => bot.is_after(&contact),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn record_inbound(&mut self, now: Timestamp) {
        self.last_message_at = Some(now);
    }

    /// A chatbot prompt now awaits a reply; any earlier reminder is void.
    pub fn record_chatbot_prompt(&mut self, now: Timestamp) {
        self.chatbot_last_message_at = Some(now);
        self.chatbot_reminder_sent = false;
    }

    pub fn record_reminder(&mut self) {
        self.chatbot_reminder_sent = true;
    }

    /// Nothing from the chatbot is outstanding any more.
    pub fn clear_chatbot_wait(&mut self) {
        self.chatbot_last_message_at = None;
        self.chatbot_reminder_sent = false;
    }
}
