//! Liveness tuning parameters.
//!
//! Defaults reproduce the empirically tuned values of the blink gate. Every
//! field can be overridden from TOML; omitted fields keep their default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_BLINK_THRESHOLD: f32 = 0.12;
pub const DEFAULT_ROLLING_AVERAGE_COUNT: usize = 50;
pub const DEFAULT_BLINK_DURATION_MS: u64 = 3000;
pub const DEFAULT_FACING_THRESHOLD: f32 = 0.35;
pub const DEFAULT_REQUIRED_BLINKS: u32 = 3;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("rolling_average_count must be at least 1")]
    EmptyWindow,
    #[error("blink_threshold must be in (0, 1), got {0}")]
    BlinkThreshold(f32),
    #[error("facing_threshold must be positive, got {0}")]
    FacingThreshold(f32),
    #[error("required_blinks must be at least 1")]
    NoBlinksRequired,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LivenessConfig {
    /// Relative drop below the rolling EAR baseline that counts as a closed eye.
    pub blink_threshold: f32,
    /// Number of recent EAR samples forming the baseline.
    pub rolling_average_count: usize,
    /// How long (ms) after the latest blink the gate may still pass.
    pub blink_duration_ms: u64,
    /// Maximum nose offset (fraction of eye span) still considered frontal.
    pub facing_threshold: f32,
    /// Blinks needed before the session can become live.
    pub required_blinks: u32,
    /// Expected spacing of frames; used to synthesize missing timestamps.
    pub frame_interval_ms: u64,
    /// Compare each sample against the baseline of the samples before it,
    /// instead of a baseline that already contains it.
    pub baseline_excludes_current: bool,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
            rolling_average_count: DEFAULT_ROLLING_AVERAGE_COUNT,
            blink_duration_ms: DEFAULT_BLINK_DURATION_MS,
            facing_threshold: DEFAULT_FACING_THRESHOLD,
            required_blinks: DEFAULT_REQUIRED_BLINKS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            baseline_excludes_current: false,
        }
    }
}

impl LivenessConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&src)?;
        tracing::debug!(path = %path.display(), ?config, "loaded liveness config");
        Ok(config)
    }

    /// Reject parameter combinations the detector cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_average_count == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if !(self.blink_threshold > 0.0 && self.blink_threshold < 1.0) {
            return Err(ConfigError::BlinkThreshold(self.blink_threshold));
        }
        if !(self.facing_threshold.is_finite() && self.facing_threshold > 0.0) {
            return Err(ConfigError::FacingThreshold(self.facing_threshold));
        }
        if self.required_blinks == 0 {
            return Err(ConfigError::NoBlinksRequired);
        }
        if self.blink_duration_ms == 0 {
            return Err(ConfigError::ZeroDuration("blink_duration_ms"));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("frame_interval_ms"));
        }
        Ok(())
    }
}
