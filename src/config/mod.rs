//! Application configuration module
//!
//! Configuration is loaded from environment variables using the `config` and
//! `dotenvy` crates. Variables carry the `CHATFLOW` prefix and nested values
//! are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use chatflow::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Ticking every {:?}", config.sla.tick_interval());
//! ```

mod database;
mod error;
mod redis;
mod runtime;
mod sla;
mod transport;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use runtime::{Environment, RuntimeConfig};
pub use sla::SlaConfig;
pub use transport::TransportConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Environment and logging
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Redis for tenant broadcasts
    pub redis: RedisConfig,

    /// Outbound messaging gateway
    pub transport: TransportConfig,

    #[serde(default)]
    pub sla: SlaConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `CHATFLOW__SECTION__KEY`
    /// variables, e.g. `CHATFLOW__SLA__TICK_INTERVAL_SECS=30`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHATFLOW")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.runtime.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.transport.validate(&self.runtime.environment)?;
        self.sla.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.runtime.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const REQUIRED: [(&str, &str); 4] = [
        ("CHATFLOW__DATABASE__URL", "postgresql://test@localhost/test"),
        ("CHATFLOW__REDIS__URL", "redis://localhost:6379"),
        ("CHATFLOW__TRANSPORT__GATEWAY_URL", "http://localhost:9000"),
        ("CHATFLOW__TRANSPORT__API_TOKEN", "test-token"),
    ];

    const OPTIONAL: [&str; 3] = [
        "CHATFLOW__SLA__TICK_INTERVAL_SECS",
        "CHATFLOW__SLA__SETTINGS_CACHE_TTL_SECS",
        "CHATFLOW__RUNTIME__ENVIRONMENT",
    ];

    fn set_minimal_env() {
        for (key, value) in REQUIRED {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in REQUIRED {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config loads");
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.sla.settings_cache_ttl_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHATFLOW__SLA__TICK_INTERVAL_SECS", "15");
        env::set_var("CHATFLOW__SLA__SETTINGS_CACHE_TTL_SECS", "45");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config loads");
        assert_eq!(config.sla.tick_interval_secs, 15);
        assert_eq!(config.sla.settings_cache_ttl_secs, 45);
    }

    #[test]
    fn test_production_requires_https_gateway() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHATFLOW__RUNTIME__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config loads");
        assert!(config.is_production());
        assert_eq!(config.validate(), Err(ValidationError::GatewayMustBeHttps));
    }

    #[test]
    fn test_missing_required_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
