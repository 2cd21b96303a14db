//! SLA processor configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// SLA processor settings
#[derive(Debug, Clone, Deserialize)]
pub struct SlaConfig {
    /// Seconds between processor ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// How long tenant SLA settings stay cached, in seconds
    #[serde(default = "default_settings_cache_ttl")]
    pub settings_cache_ttl_secs: u64,
}

impl SlaConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn settings_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.settings_cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("tick_interval_secs"));
        }
        Ok(())
    }
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            settings_cache_ttl_secs: default_settings_cache_ttl(),
        }
    }
}

fn default_tick_interval() -> u64 {
    60
}

fn default_settings_cache_ttl() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let sla = SlaConfig::default();
        assert_eq!(sla.tick_interval(), Duration::from_secs(60));
        assert_eq!(sla.settings_cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let sla = SlaConfig {
            tick_interval_secs: 0,
            ..Default::default()
        };
        assert!(sla.validate().is_err());
    }
}
