//! Outbound channel transports.

mod http_sender;

pub use http_sender::{HttpMessageSender, HttpSenderConfig};
