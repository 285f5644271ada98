use std::path::PathBuf;
use std::time::Duration;

use visage_liveness::{ConfigError, LivenessConfig};

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tuning for every session the daemon starts.
    pub liveness: LivenessConfig,
    /// Optional TOML file the liveness tuning was loaded from.
    pub liveness_path: Option<PathBuf>,
    /// Sessions older than this are discarded.
    pub session_timeout: Duration,
    /// Upper bound on concurrently open sessions.
    pub max_sessions: usize,
    /// Serve on the session bus (development) instead of the system bus.
    pub session_bus: bool,
}

impl Config {
    /// Load configuration from `VISAGE_*` environment variables with defaults.
    ///
    /// `VISAGE_LIVENESS_CONFIG` names a TOML file loaded first; individual
    /// tuning variables then override its values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let liveness_path = std::env::var("VISAGE_LIVENESS_CONFIG").ok().map(PathBuf::from);
        let base = match &liveness_path {
            Some(path) => LivenessConfig::load(path)?,
            None => LivenessConfig::default(),
        };

        let liveness = LivenessConfig {
            blink_threshold: env_or("VISAGE_BLINK_THRESHOLD", base.blink_threshold),
            rolling_average_count: env_or("VISAGE_ROLLING_AVERAGE_COUNT", base.rolling_average_count),
            blink_duration_ms: env_or("VISAGE_BLINK_DURATION_MS", base.blink_duration_ms),
            facing_threshold: env_or("VISAGE_FACING_THRESHOLD", base.facing_threshold),
            required_blinks: env_or("VISAGE_REQUIRED_BLINKS", base.required_blinks),
            ..base
        };
        liveness.validate()?;

        Ok(Self {
            liveness,
            liveness_path,
            session_timeout: Duration::from_secs(env_or("VISAGE_SESSION_TIMEOUT_SECS", 30)),
            max_sessions: env_or("VISAGE_MAX_SESSIONS", 16),
            session_bus: std::env::var("VISAGE_SESSION_BUS").is_ok(),
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: std::str::FromStr>(value: Option<&str>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
