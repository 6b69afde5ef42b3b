//! Runtime configuration for opening a dictionary store.
//!
//! # Responsibility
//! - Hold database location, pool sizing, timeouts and logging settings.
//! - Read overrides from `LEXICON_*` environment variables.
//!
//! # Invariants
//! - Unset variables keep their defaults.
//! - A set but unparsable variable is an error, never silently ignored.

use crate::db::{PoolConfig, MAX_BUSY_TIMEOUT};
use crate::logging::default_log_level;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "LEXICON_DB_PATH";
pub const ENV_POOL_SIZE: &str = "LEXICON_POOL_SIZE";
pub const ENV_LOCK_TIMEOUT_MS: &str = "LEXICON_LOCK_TIMEOUT_MS";
pub const ENV_ACQUIRE_TIMEOUT_MS: &str = "LEXICON_ACQUIRE_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "LEXICON_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LEXICON_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings consumed by [`crate::open_service`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryConfig {
    /// Database file. `None` selects a private in-memory database.
    pub db_path: Option<PathBuf>,
    /// Maximum open connections for a file database. Default: 8
    pub pool_size: usize,
    /// How long a transaction waits for SQLite write locks. Default: 5s
    pub lock_timeout: Duration,
    /// How long a request waits for a pooled connection. Default: 30s
    pub acquire_timeout: Duration,
    pub log_level: String,
    /// Directory for rolling log files. `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            pool_size: 8,
            lock_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl DictionaryConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `LEXICON_*` key. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = read(ENV_POOL_SIZE) {
            config.pool_size = parse_pool_size(&raw)?;
        }
        if let Some(raw) = read(ENV_LOCK_TIMEOUT_MS) {
            config.lock_timeout = parse_lock_timeout(&raw)?;
        }
        if let Some(raw) = read(ENV_ACQUIRE_TIMEOUT_MS) {
            config.acquire_timeout = parse_millis(ENV_ACQUIRE_TIMEOUT_MS, &raw)?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    #[must_use]
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Pool policy derived from this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::default()
            .max_size(self.pool_size)
            .acquire_timeout(self.acquire_timeout)
            .busy_timeout(self.lock_timeout)
    }
}

fn parse_pool_size(raw: &str) -> Result<usize, ConfigError> {
    match raw.parse::<usize>() {
        Ok(0) => Err(invalid(ENV_POOL_SIZE, raw, "must be at least 1".to_string())),
        Ok(size) => Ok(size),
        Err(err) => Err(invalid(ENV_POOL_SIZE, raw, err.to_string())),
    }
}

fn parse_lock_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let timeout = parse_millis(ENV_LOCK_TIMEOUT_MS, raw)?;
    if timeout > MAX_BUSY_TIMEOUT {
        return Err(invalid(
            ENV_LOCK_TIMEOUT_MS,
            raw,
            format!("must be at most {} ms", MAX_BUSY_TIMEOUT.as_millis()),
        ));
    }
    Ok(timeout)
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|err| invalid(key, raw, err.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = DictionaryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, DictionaryConfig::default());
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
        assert!(config.db_path.is_none());
    }

    #[test]
    fn lookup_overrides_every_field() {
        let config = DictionaryConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/var/lib/lexicon/dict.db"),
            (ENV_POOL_SIZE, "3"),
            (ENV_LOCK_TIMEOUT_MS, "250"),
            (ENV_ACQUIRE_TIMEOUT_MS, "1500"),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_LOG_DIR, "/tmp/lexicon-logs"),
        ]))
        .unwrap();

        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/lexicon/dict.db"))
        );
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.acquire_timeout, Duration::from_millis(1500));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/lexicon-logs")));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config =
            DictionaryConfig::from_lookup(lookup_from(&[(ENV_DB_PATH, "  "), (ENV_POOL_SIZE, "")]))
                .unwrap();
        assert!(config.db_path.is_none());
        assert_eq!(config.pool_size, 8);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = DictionaryConfig::from_lookup(lookup_from(&[(ENV_POOL_SIZE, "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: ENV_POOL_SIZE, .. }
        ));

        let err = DictionaryConfig::from_lookup(lookup_from(&[(ENV_POOL_SIZE, "0")])).unwrap_err();
        assert!(err.to_string().contains("at least 1"));

        let err = DictionaryConfig::from_lookup(lookup_from(&[(ENV_LOCK_TIMEOUT_MS, "-5")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: ENV_LOCK_TIMEOUT_MS, .. }
        ));

        let err =
            DictionaryConfig::from_lookup(lookup_from(&[(ENV_LOCK_TIMEOUT_MS, "3000000000")]))
                .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: ENV_LOCK_TIMEOUT_MS, .. }
        ));

        let max = MAX_BUSY_TIMEOUT.as_millis().to_string();
        let config =
            DictionaryConfig::from_lookup(lookup_from(&[(ENV_LOCK_TIMEOUT_MS, max.as_str())]))
                .unwrap();
        assert_eq!(config.lock_timeout, MAX_BUSY_TIMEOUT);
    }

    #[test]
    fn builder_lock_timeout_is_capped_in_pool_config() {
        let pool = DictionaryConfig::default()
            .lock_timeout(Duration::MAX)
            .pool_config();
        assert_eq!(pool.busy_timeout, MAX_BUSY_TIMEOUT);
    }

    #[test]
    fn pool_config_carries_sizes_and_timeouts() {
        let pool = DictionaryConfig::default()
            .pool_size(2)
            .lock_timeout(Duration::from_millis(40))
            .acquire_timeout(Duration::from_millis(90))
            .pool_config();
        assert_eq!(pool.max_size, 2);
        assert_eq!(pool.busy_timeout, Duration::from_millis(40));
        assert_eq!(pool.acquire_timeout, Duration::from_millis(90));
    }
}
