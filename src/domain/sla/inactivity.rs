//! Client inactivity decisions for chatbot conversations.

use crate::domain::foundation::Timestamp;
use crate::domain::messaging::Contact;

use super::settings::SlaSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactivityAction {
    Reminder,
    AutoClose,
}

/// Decides what to do about a contact that has not answered the chatbot.
///
/// Auto-close wins over the reminder, and a reminder is sent at most once
/// per outstanding prompt. Contacts not awaiting a reply yield `None`.
pub fn inactivity_action(
    contact: &Contact,
    settings: &SlaSettings,
    now: &Timestamp,
) -> Option<InactivityAction> {
    if !contact.is_awaiting_reply() {
        return None;
    }
    let since = contact.chatbot_last_message_at?;
    let idle = now.minutes_since(&since);

    let reached = |enabled: bool, minutes: u32| enabled && minutes > 0 && idle >= minutes as i64;

    if reached(
        settings.client_auto_close_enabled,
        settings.client_auto_close_minutes,
    ) {
        return Some(InactivityAction::AutoClose);
    }
    if !contact.chatbot_reminder_sent
        && reached(settings.client_reminder_enabled, settings.client_reminder_minutes)
    {
        return Some(InactivityAction::Reminder);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TenantId;

    fn settings() -> SlaSettings {
        let mut s = SlaSettings::enabled(TenantId::new(), 0, 0, 0, 0);
        s.client_reminder_enabled = true;
        s.client_reminder_minutes = 10;
        s.client_auto_close_enabled = true;
        s.client_auto_close_minutes = 30;
        s
    }

    fn waiting_contact(since: Timestamp) -> Contact {
        let mut c = Contact::new(TenantId::new(), "main", "+15550100");
        c.record_chatbot_prompt(since);
        c
    }

    #[test]
    fn nothing_before_thresholds() {
        let now = Timestamp::now();
        let c = waiting_contact(now);
        assert_eq!(inactivity_action(&c, &settings(), &now.plus_minutes(9)), None);
    }

    #[test]
    fn reminder_once_then_close() {
        let now = Timestamp::now();
        let mut c = waiting_contact(now);
        let s = settings();

        assert_eq!(
            inactivity_action(&c, &s, &now.plus_minutes(10)),
            Some(InactivityAction::Reminder)
        );
        c.record_reminder();
        assert_eq!(inactivity_action(&c, &s, &now.plus_minutes(20)), None);
        assert_eq!(
            inactivity_action(&c, &s, &now.plus_minutes(30)),
            Some(InactivityAction::AutoClose)
        );
    }

    #[test]
    fn auto_close_takes_precedence() {
        let now = Timestamp::now();
        let c = waiting_contact(now);
        assert_eq!(
            inactivity_action(&c, &settings(), &now.plus_minutes(45)),
            Some(InactivityAction::AutoClose)
        );
    }

    #[test]
    fn answered_contacts_are_left_alone() {
        let now = Timestamp::now();
        let mut c = waiting_contact(now);
        c.record_inbound(now.plus_minutes(1));
        assert_eq!(inactivity_action(&c, &settings(), &now.plus_minutes(60)), None);
    }

    #[test]
    fn disabled_thresholds_do_nothing() {
        let now = Timestamp::now();
        let c = waiting_contact(now);
        let mut s = settings();
        s.client_auto_close_enabled = false;
        s.client_reminder_minutes = 0;
        assert_eq!(inactivity_action(&c, &s, &now.plus_minutes(600)), None);
    }
}
