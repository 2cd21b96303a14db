//! HTTP gateway implementation of MessageSender.
//!
//! Posts `{account, to, body}` as JSON to `{base_url}/messages` with a
//! bearer token and reads the channel message id from the response.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MessageSender;

/// Configuration for the HTTP gateway sender.
#[derive(Debug, Clone)]
pub struct HttpSenderConfig {
    api_token: Secret<String>,
    /// Base URL of the messaging gateway.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpSenderConfig {
    pub fn new(base_url: impl Into<String>, api_token: Secret<String>) -> Self {
        Self {
            api_token,
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_token(&self) -> &str {
        self.api_token.expose_secret()
    }
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    account: &'a str,
    to: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendTextResponse {
    message_id: String,
}

pub struct HttpMessageSender {
    config: HttpSenderConfig,
    client: Client,
}

impl HttpMessageSender {
    /// # Errors
    ///
    /// - `TransportError` if the HTTP client cannot be built
    pub fn new(config: HttpSenderConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::TransportError,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.base_url.trim_end_matches('/'))
    }

    async fn check_status(response: Response) -> Result<Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(DomainError::new(
            ErrorCode::TransportError,
            format!("Gateway returned {}: {}", status, error_body),
        )
        .with_detail("status", status.as_u16().to_string()))
    }
}

#[async_trait]
impl MessageSender for HttpMessageSender {
    async fn send_text(&self, account: &str, to: &str, body: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(self.config.api_token())
            .json(&SendTextRequest { account, to, body })
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("Gateway timed out after {}s", self.config.timeout.as_secs())
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    e.to_string()
                };
                DomainError::new(ErrorCode::TransportError, message)
            })?;

        let parsed: SendTextResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::TransportError,
                    format!("Failed to parse gateway response: {}", e),
                )
            })?;

        Ok(parsed.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> HttpSenderConfig {
        HttpSenderConfig::new(url, Secret::new("token".to_string()))
    }

    #[test]
    fn messages_url_tolerates_trailing_slash() {
        let sender = HttpMessageSender::new(config("http://gateway.local/")).unwrap();
        assert_eq!(sender.messages_url(), "http://gateway.local/messages");
    }

    #[test]
    fn config_defaults_to_ten_second_timeout() {
        let c = config("http://gateway.local").with_timeout(Duration::from_secs(3));
        assert_eq!(c.timeout, Duration::from_secs(3));
        assert_eq!(config("x").timeout, Duration::from_secs(10));
    }

    #[test]
    fn request_serializes_expected_fields() {
        let json = serde_json::to_value(SendTextRequest {
            account: "main",
            to: "+15550100",
            body: "hi",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"account": "main", "to": "+15550100", "body": "hi"}));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_transport_error() {
        let sender = HttpMessageSender::new(
            config("http://127.0.0.1:9").with_timeout(Duration::from_millis(500)),
        )
        .unwrap();
        let err = sender.send_text("main", "+1", "hi").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TransportError);
    }
}
