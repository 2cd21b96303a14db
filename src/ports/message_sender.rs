//! MessageSender port - outbound transport to the messaging channel.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Sends text over a channel account.
///
/// Implementations must not block indefinitely; callers additionally wrap
/// sends in a bounded timeout.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `body` to `to` from `account`, returning the channel's message id.
    ///
    /// # Errors
    ///
    /// - `TransportError` when the channel rejects or fails the send
    async fn send_text(&self, account: &str, to: &str, body: &str) -> Result<String, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_sender_is_object_safe() {
        fn _accepts_dyn(_sender: &dyn MessageSender) {}
    }
}
