//! Messaging gateway configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::runtime::Environment;

/// Outbound messaging gateway
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the gateway's HTTP API
    pub gateway_url: String,

    /// Bearer token for the gateway
    pub api_token: Secret<String>,

    /// Upper bound for a single send, in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

impl TransportConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.gateway_url.is_empty() {
            return Err(ValidationError::MissingRequired("TRANSPORT_GATEWAY_URL"));
        }
        let https = self.gateway_url.starts_with("https://");
        if !https && !self.gateway_url.starts_with("http://") {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if *environment == Environment::Production && !https {
            return Err(ValidationError::GatewayMustBeHttps);
        }
        if self.send_timeout_secs == 0 {
            return Err(ValidationError::MustBePositive("send_timeout_secs"));
        }
        Ok(())
    }
}

fn default_send_timeout() -> u64 {
    10
}
