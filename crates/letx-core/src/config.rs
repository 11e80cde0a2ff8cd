//! # Engine Configuration
//!
//! TOML-loaded parameters of the link-quality engine. Every key is
//! optional; an empty document gives the defaults.
//!
//! ```toml
//! version = 1
//! transmission_range = 250.0
//! static_link_lifetime = 1000.0
//! break_threshold = 1.0
//! probe_interval_ms = 1000
//! ```

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::expiry::{ExpiryModel, DEFAULT_STATIC_LIFETIME, DEFAULT_TRANSMISSION_RANGE};
use crate::metric::{HybridMetric, DEFAULT_BREAK_THRESHOLD};

pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_PROBE_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Raw document as parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfigInput {
    pub version: u32,
    pub transmission_range: Option<f64>,
    pub static_link_lifetime: Option<f64>,
    pub break_threshold: Option<f64>,
    pub probe_interval_ms: Option<u64>,
}

/// Resolved, validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub version: u32,
    pub transmission_range: f64,
    pub static_link_lifetime: f64,
    pub break_threshold: f64,
    pub probe_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            transmission_range: DEFAULT_TRANSMISSION_RANGE,
            static_link_lifetime: DEFAULT_STATIC_LIFETIME,
            break_threshold: DEFAULT_BREAK_THRESHOLD,
            probe_interval: Duration::from_millis(DEFAULT_PROBE_INTERVAL_MS),
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}

impl EngineConfigInput {
    pub fn resolve(self) -> Result<EngineConfig, ConfigError> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(version));
        }

        let defaults = EngineConfig::default();
        let transmission_range = positive(
            "transmission_range",
            self.transmission_range.unwrap_or(defaults.transmission_range),
        )?;
        let static_link_lifetime = positive(
            "static_link_lifetime",
            self.static_link_lifetime
                .unwrap_or(defaults.static_link_lifetime),
        )?;
        let break_threshold = self.break_threshold.unwrap_or(defaults.break_threshold);
        if !break_threshold.is_finite() || break_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "break_threshold",
                reason: format!("must be a non-negative number, got {break_threshold}"),
            });
        }
        let probe_interval_ms = self
            .probe_interval_ms
            .unwrap_or(DEFAULT_PROBE_INTERVAL_MS);
        if probe_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "probe_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(EngineConfig {
            version,
            transmission_range,
            static_link_lifetime,
            break_threshold,
            probe_interval: Duration::from_millis(probe_interval_ms),
        })
    }
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(EngineConfig::default());
        }
        let parsed: EngineConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }

    pub fn expiry_model(&self) -> ExpiryModel {
        ExpiryModel::new(self.transmission_range, self.static_link_lifetime)
    }

    pub fn hybrid_metric(&self) -> HybridMetric {
        HybridMetric::new(self.expiry_model(), self.break_threshold)
    }
}
