//! Redis configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Redis configuration for tenant broadcasts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,
}

impl RedisConfig {
    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_missing_url() {
        assert!(RedisConfig::default().validate().is_err());
    }

    #[test]
    fn test_validation_invalid_scheme() {
        let config = RedisConfig {
            url: "http://localhost:6379".to_string(),
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRedisUrl));
    }

    #[test]
    fn test_validation_tls_url() {
        let config = RedisConfig {
            url: "rediss://cache.internal:6380".to_string(),
        };
        assert!(config.validate().is_ok());
    }
}
