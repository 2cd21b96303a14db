//! Contacts and automated outbound messages.

mod contact;
mod outbound;

pub use contact::Contact;
pub use outbound::{DeliveryStatus, OutboundKind, OutboundMessage};
