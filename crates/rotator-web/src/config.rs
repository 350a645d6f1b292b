//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use rotation::{RotationConfig, DEFAULT_SEQUENCE_LENGTH};

/// Rotator web server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Rotation dispatcher tuning.
    pub rotation: RotationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ROTATOR_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:rotator.db?mode=rwc` |
    /// | `ROTATION_SEQUENCE_LENGTH` | Slots per generated sequence | `1000` |
    /// | `ROTATION_RANDOM_REFRESH_SECS` | Max age of a random sequence | `3600` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("ROTATOR_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = lookup("SQLITE_PATH")
            .unwrap_or_else(|| "sqlite:rotator.db?mode=rwc".to_string());

        let sequence_length = match lookup("ROTATION_SEQUENCE_LENGTH") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|len| *len > 0)
                .ok_or(ConfigError::InvalidSequenceLength(raw))?,
            None => DEFAULT_SEQUENCE_LENGTH,
        };

        let random_refresh = match lookup("ROTATION_RANDOM_REFRESH_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs >= 0)
                .and_then(chrono::Duration::try_seconds)
                .ok_or(ConfigError::InvalidRandomRefresh(raw))?,
            None => chrono::Duration::hours(1),
        };

        Ok(Self {
            addr,
            database_url,
            rotation: RotationConfig {
                sequence_length,
                random_refresh,
                ..RotationConfig::default()
            },
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ROTATOR_ADDR format")]
    InvalidAddr,

    #[error("Invalid ROTATION_SEQUENCE_LENGTH: {0} (must be a positive integer)")]
    InvalidSequenceLength(String),

    #[error("Invalid ROTATION_RANDOM_REFRESH_SECS: {0} (must be a non-negative integer)")]
    InvalidRandomRefresh(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:8790");
        assert_eq!(config.database_url, "sqlite:rotator.db?mode=rwc");
        assert_eq!(config.rotation, RotationConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ROTATOR_ADDR", "0.0.0.0:9000"),
            ("SQLITE_PATH", "sqlite::memory:"),
            ("ROTATION_SEQUENCE_LENGTH", "500"),
            ("ROTATION_RANDOM_REFRESH_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.rotation.sequence_length, 500);
        assert_eq!(config.rotation.random_refresh, chrono::Duration::seconds(60));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("ROTATOR_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddr)
        ));
        assert!(matches!(
            load(&[("ROTATION_SEQUENCE_LENGTH", "0")]),
            Err(ConfigError::InvalidSequenceLength(_))
        ));
        assert!(matches!(
            load(&[("ROTATION_RANDOM_REFRESH_SECS", "-5")]),
            Err(ConfigError::InvalidRandomRefresh(_))
        ));
        // Parses as i64 but does not fit a duration.
        assert!(matches!(
            load(&[("ROTATION_RANDOM_REFRESH_SECS", "9223372036854775807")]),
            Err(ConfigError::InvalidRandomRefresh(_))
        ));
    }
}
