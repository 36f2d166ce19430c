//! Control module: engine configuration and the switches the engine reads.

pub mod config;

pub use config::{ConfigError, ConfigurationStore, EngineConfig, Setting};
