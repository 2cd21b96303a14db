//! Runtime configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Process-wide settings: environment and logging
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Environment name
    #[serde(default)]
    pub environment: Environment,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `json` for structured output, `pretty` for development
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Application environment
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Validate runtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.log_format.to_ascii_lowercase().as_str() {
            "json" | "pretty" => Ok(()),
            _ => Err(ValidationError::InvalidLogFormat(self.log_format.clone())),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info,chatflow=debug,sqlx=warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let mut config = RuntimeConfig::default();
        assert!(!config.is_production());

        config.environment = Environment::Production;
        assert!(config.is_production());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let config = RuntimeConfig {
            log_format: "xml".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidLogFormat("xml".to_string()))
        );
    }
}
