//! Simulation parameters, loaded from TOML with an embedded `[engine]`
//! table for the link-quality engine.
//!
//! ```toml
//! seed = 7
//! nodes = 12
//! steps = 120
//! arena = 600.0
//! max_speed = 15.0
//! base_delivery = 0.95
//!
//! [engine]
//! transmission_range = 250.0
//! break_threshold = 1.0
//! ```

use letx_core::config::{ConfigError, EngineConfig, EngineConfigInput};
use serde::Deserialize;

const DEFAULT_SEED: u64 = 1;
const DEFAULT_NODES: usize = 8;
const DEFAULT_STEPS: u64 = 60;
const DEFAULT_ARENA: f64 = 500.0;
const DEFAULT_MAX_SPEED: f64 = 10.0;
const DEFAULT_BASE_DELIVERY: f64 = 0.9;

/// Node addresses are `10.0.x.y`, so at most this many fit.
pub const MAX_NODES: usize = 254 * 254;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfigInput {
    pub seed: Option<u64>,
    pub nodes: Option<usize>,
    pub steps: Option<u64>,
    pub arena: Option<f64>,
    pub max_speed: Option<f64>,
    pub base_delivery: Option<f64>,
    pub engine: EngineConfigInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub seed: u64,
    pub nodes: usize,
    /// Probe periods to run.
    pub steps: u64,
    /// Side of the square arena, same unit as `transmission_range`.
    pub arena: f64,
    /// Speed cap per axis, in units per second.
    pub max_speed: f64,
    /// Delivery probability at zero distance; falls linearly to 0 at range.
    pub base_delivery: f64,
    pub engine: EngineConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            nodes: DEFAULT_NODES,
            steps: DEFAULT_STEPS,
            arena: DEFAULT_ARENA,
            max_speed: DEFAULT_MAX_SPEED,
            base_delivery: DEFAULT_BASE_DELIVERY,
            engine: EngineConfig::default(),
        }
    }
}

impl SimConfigInput {
    pub fn resolve(self) -> Result<SimConfig, ConfigError> {
        let engine = self.engine.resolve()?;

        let nodes = self.nodes.unwrap_or(DEFAULT_NODES);
        if nodes == 0 || nodes > MAX_NODES {
            return Err(ConfigError::Invalid {
                field: "nodes",
                reason: format!("must be between 1 and {MAX_NODES}, got {nodes}"),
            });
        }
        let arena = self.arena.unwrap_or(DEFAULT_ARENA);
        if !arena.is_finite() || arena <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "arena",
                reason: format!("must be a positive number, got {arena}"),
            });
        }
        let max_speed = self.max_speed.unwrap_or(DEFAULT_MAX_SPEED);
        if !max_speed.is_finite() || max_speed < 0.0 {
            return Err(ConfigError::Invalid {
                field: "max_speed",
                reason: format!("must be a non-negative number, got {max_speed}"),
            });
        }
        let base_delivery = self.base_delivery.unwrap_or(DEFAULT_BASE_DELIVERY);
        if !(0.0..=1.0).contains(&base_delivery) {
            return Err(ConfigError::Invalid {
                field: "base_delivery",
                reason: format!("must be within 0.0..=1.0, got {base_delivery}"),
            });
        }

        Ok(SimConfig {
            seed: self.seed.unwrap_or(DEFAULT_SEED),
            nodes,
            steps: self.steps.unwrap_or(DEFAULT_STEPS),
            arena,
            max_speed,
            base_delivery,
            engine,
        })
    }
}

impl SimConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(SimConfig::default());
        }
        let parsed: SimConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }
}
