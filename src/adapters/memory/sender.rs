//! Recording message sender for tests and dry runs.

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MessageSender;

/// A text that went through the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub account: String,
    pub to: String,
    pub body: String,
}

/// Records every send instead of contacting a channel.
///
/// Recipients listed with [`RecordingSender::fail_for`] get a transport
/// error; [`RecordingSender::with_delay`] makes every send slow.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: RwLock<Vec<SentText>>,
    failing: RwLock<HashSet<String>>,
    delay: Option<Duration>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn fail_for(&self, to: impl Into<String>) {
        self.failing.write().await.insert(to.into());
    }

    pub async fn sent(&self) -> Vec<SentText> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|s| s.to == to)
            .map(|s| s.body.clone())
            .collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, account: &str, to: &str, body: &str) -> Result<String, DomainError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().await.contains(to) {
            return Err(DomainError::new(
                ErrorCode::TransportError,
                format!("recipient {} unreachable", to),
            ));
        }

        let mut sent = self.sent.write().await;
        sent.push(SentText {
            account: account.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(format!("mem-{}", sent.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends_and_fails_on_request() {
        let sender = RecordingSender::new();
        sender.fail_for("+2").await;

        assert_eq!(sender.send_text("main", "+1", "hi").await.unwrap(), "mem-1");
        let err = sender.send_text("main", "+2", "hi").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::TransportError);
        assert_eq!(sender.sent_to("+1").await, vec!["hi".to_string()]);
        assert!(sender.sent_to("+2").await.is_empty());
    }
}
