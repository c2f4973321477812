//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Backoff policy for failed auto-saves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per save, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt. Doubles on every further attempt.
    pub initial_backoff: Duration,
    /// Upper bound on a single backoff delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No retries: one attempt, then report.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Auto-save controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before a save is attempted.
    pub quiet_period: Duration,
    /// Whether saves fire at all. Edits are still tracked while disabled.
    pub enabled: bool,
    pub retry: RetryPolicy,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(2000),
            enabled: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Port the REST API listens on.
    pub http_port: u16,
    /// Defaults for auto-save controllers handed out by the service.
    pub autosave: AutoSaveConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/creator-onboard.db"),
            http_port: 8080,
            autosave: AutoSaveConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build the configuration from `CREATOR_ONBOARD_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("CREATOR_ONBOARD_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(port) = parse_var::<u16>(&lookup, "CREATOR_ONBOARD_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CREATOR_ONBOARD_AUTOSAVE_MS")? {
            config.autosave.quiet_period = Duration::from_millis(ms);
        }
        if let Some(enabled) = parse_var::<bool>(&lookup, "CREATOR_ONBOARD_AUTOSAVE_ENABLED")? {
            config.autosave.enabled = enabled;
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "CREATOR_ONBOARD_AUTOSAVE_ATTEMPTS")? {
            if attempts == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "CREATOR_ONBOARD_AUTOSAVE_ATTEMPTS".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            config.autosave.retry.max_attempts = attempts;
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.autosave.quiet_period, Duration::from_millis(2000));
        assert!(config.autosave.enabled);
        assert_eq!(config.autosave.retry.max_attempts, 3);
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CREATOR_ONBOARD_DB_PATH", "/tmp/onboard.db"),
            ("CREATOR_ONBOARD_HTTP_PORT", "9090"),
            ("CREATOR_ONBOARD_AUTOSAVE_MS", "750"),
            ("CREATOR_ONBOARD_AUTOSAVE_ENABLED", "false"),
            ("CREATOR_ONBOARD_AUTOSAVE_ATTEMPTS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/onboard.db"));
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.autosave.quiet_period, Duration::from_millis(750));
        assert!(!config.autosave.enabled);
        assert_eq!(config.autosave.retry.max_attempts, 5);
    }

    #[test]
    fn malformed_value_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("CREATOR_ONBOARD_HTTP_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("CREATOR_ONBOARD_HTTP_PORT"));

        let err = ServerConfig::from_lookup(lookup(&[("CREATOR_ONBOARD_AUTOSAVE_ATTEMPTS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_after(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff_after(5), Duration::from_secs(5));
        assert_eq!(policy.backoff_after(40), Duration::from_secs(5));
    }
}
