//! Bounded outbound sends.

use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MessageSender;

/// Sends through `sender`, failing with `TransportError` after `timeout`.
pub(crate) async fn send_with_timeout(
    sender: &dyn MessageSender,
    timeout: Duration,
    account: &str,
    to: &str,
    body: &str,
) -> Result<String, DomainError> {
    match tokio::time::timeout(timeout, sender.send_text(account, to, body)).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::new(
            ErrorCode::TransportError,
            format!("Send timed out after {}ms", timeout.as_millis()),
        )),
    }
}
