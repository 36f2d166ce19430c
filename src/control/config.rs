//! Engine configuration loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::simulation::propagation::PropagationParameters;

/// Boolean switches the engine looks up by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Radios can receive while transmitting on the same set.
    FullDuplex,
    /// Vehicle intercom is available.
    IntercomEnabled,
}

/// Read-only configuration lookups. Implementations must be safe to read
/// from many routing threads at once.
pub trait ConfigurationStore: Send + Sync {
    fn flag(&self, setting: Setting) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration of the reachability engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    pub full_duplex: bool,
    pub intercom_enabled: bool,
    #[serde(flatten)]
    pub propagation: PropagationParameters,
    /// Expected interval between position packets. Participants expire after
    /// five of these without an update.
    pub position_update_timeout_ms: u64,
    /// Skip the ground-speaker scan when the speaker's plain effective
    /// distance exceeds its range and no relay exists.
    pub speaker_scan_distance_gate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            full_duplex: false,
            intercom_enabled: true,
            propagation: PropagationParameters::default(),
            position_update_timeout_ms: 4000,
            speaker_scan_distance_gate: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing keys fall back to their defaults; the result is validated.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        log::info!("Loaded engine configuration from {}", config_path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.propagation;
        if !(p.terrain_interception_coefficient.is_finite() && p.terrain_interception_coefficient >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "terrain-interception-coefficient {} must be non-negative",
                p.terrain_interception_coefficient
            )));
        }
        if !(p.receiving_distance_multiplier.is_finite() && p.receiving_distance_multiplier > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "receiving-distance-multiplier {} must be positive",
                p.receiving_distance_multiplier
            )));
        }
        if !(p.diver_radio_reference_distance.is_finite() && p.diver_radio_reference_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "diver-radio-reference-distance {} must be positive",
                p.diver_radio_reference_distance
            )));
        }
        if self.position_update_timeout_ms == 0 {
            return Err(ConfigError::Invalid("position-update-timeout-ms must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn position_update_timeout(&self) -> Duration {
        Duration::from_millis(self.position_update_timeout_ms)
    }

    /// Derive the default config path from a scene file path.
    ///
    /// Replaces the scene filename with "config.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &Path) -> PathBuf {
        scene_path.parent().unwrap_or(Path::new(".")).join("config.toml")
    }
}

impl ConfigurationStore for EngineConfig {
    fn flag(&self, setting: Setting) -> bool {
        match setting {
            Setting::FullDuplex => self.full_duplex,
            Setting::IntercomEnabled => self.intercom_enabled,
        }
    }
}
