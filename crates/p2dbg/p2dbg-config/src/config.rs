use p2dbg_core::ControlLine;
use serde::Deserialize;
use std::path::Path;

/// Process-start configuration. Every field has a default, so a
/// config file only needs to name what it overrides; `port` is the one
/// field with no sane default and must always be present.
#[derive(Deserialize, Debug)]
pub struct EngineConfig {
    pub port: String,
    #[serde(default = "defaults::baud")]
    pub baud: u32,
    #[serde(default = "defaults::control_line")]
    pub control_line: ControlLine,
    #[serde(default = "defaults::ring_capacity_bytes")]
    pub ring_capacity_bytes: usize,
    #[serde(default = "defaults::pool_slots")]
    pub pool_slots: usize,
    #[serde(default = "defaults::pre_ready_queue_cap")]
    pub pre_ready_queue_cap: usize,
    #[serde(default = "defaults::drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    #[serde(default = "defaults::reset_on_connect")]
    pub reset_on_connect: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("ring_capacity_bytes ({capacity}) must be a power of two")]
    InvalidRingCapacity { capacity: usize },
}

pub mod defaults {
    use p2dbg_core::ControlLine;

    pub fn baud() -> u32 {
        2_000_000
    }

    pub fn control_line() -> ControlLine {
        ControlLine::Dtr
    }

    pub fn ring_capacity_bytes() -> usize {
        1_048_576
    }

    pub fn pool_slots() -> usize {
        1024
    }

    pub fn pre_ready_queue_cap() -> usize {
        1000
    }

    pub fn drain_timeout_ms() -> u64 {
        5000
    }

    pub fn reset_on_connect() -> bool {
        true
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: EngineConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks fields that `serde`'s type-level deserialization can't enforce
    /// on its own — currently just `ring_capacity_bytes`, whose
    /// power-of-two requirement comes from `p2dbg-ring`'s index-from-sequence
    /// masking (`seq & mask`), not from TOML shape. A bad value here must
    /// surface as a `ConfigError` the caller can report, not reach
    /// `RingConfig::new`'s `assert!` and take the process down.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ring_capacity_bytes.is_power_of_two() {
            return Err(ConfigError::InvalidRingCapacity { capacity: self.ring_capacity_bytes });
        }
        Ok(())
    }
}
