mod config;

pub use config::{defaults, ConfigError, EngineConfig};
