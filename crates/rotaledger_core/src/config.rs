//! Runtime configuration.
//!
//! # Responsibility
//! - Describe storage, registry, retry, and logging settings as one
//!   serde-loadable document with defaults for every field.
//! - Apply `ROTALEDGER_*` environment overrides.
//! - Translate settings into the option structs used by `db` and `tenant`.
//!
//! # Invariants
//! - `validate()` runs after overrides; an invalid config is never turned
//!   into registry options.

use crate::db::ConnectionOptions;
use crate::logging::{parse_level, LoggingConfig};
use crate::tenant::registry::{RegistryOptions, StorageLocation};
use crate::tenant::store::{RetryPolicy, StoreOptions};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "ROTALEDGER_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "ROTALEDGER_LOG_LEVEL";
pub const ENV_IDLE_TTL_SECS: &str = "ROTALEDGER_IDLE_TTL_SECS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding one file per tenant; in-memory stores when absent.
    pub data_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub lock_timeout_ms: u64,
    pub verify_integrity: bool,
    pub wal: bool,
    pub read_connection: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            busy_timeout_ms: 5_000,
            lock_timeout_ms: 10_000,
            verify_integrity: true,
            wal: true,
            read_connection: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub idle_ttl_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 10,
            max_backoff_ms: 250,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidEnv {
        name: &'static str,
        value: String,
    },
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::InvalidEnv { name, value } => {
                write!(f, "invalid value `{value}` in environment variable {name}")
            }
            Self::InvalidValue { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl LedgerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Applies `ROTALEDGER_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = Some(level.trim().to_string());
        }
        if let Some(ttl) = lookup(ENV_IDLE_TTL_SECS) {
            self.registry.idle_ttl_secs =
                ttl.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_IDLE_TTL_SECS,
                    value: ttl.clone(),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.storage.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(invalid("storage.data_dir", "must not be empty"));
            }
        }
        if self.storage.lock_timeout_ms == 0 {
            return Err(invalid("storage.lock_timeout_ms", "must be greater than zero"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.base_backoff_ms > self.retry.max_backoff_ms {
            return Err(invalid(
                "retry.base_backoff_ms",
                "must not exceed retry.max_backoff_ms",
            ));
        }
        if let Some(level) = &self.logging.level {
            parse_level(level).map_err(|err| invalid("logging.level", err.to_string()))?;
        }
        if let Some(dir) = &self.logging.log_dir {
            if !dir.is_absolute() {
                return Err(invalid("logging.log_dir", "must be an absolute path"));
            }
        }
        Ok(())
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            busy_timeout: Duration::from_millis(self.storage.busy_timeout_ms),
            verify_integrity: self.storage.verify_integrity,
            wal: self.storage.wal,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_backoff: Duration::from_millis(self.retry.base_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    /// Validates and converts into [`RegistryOptions`].
    pub fn registry_options(&self) -> Result<RegistryOptions, ConfigError> {
        self.validate()?;
        let location = match &self.storage.data_dir {
            Some(dir) => StorageLocation::Directory(dir.clone()),
            None => StorageLocation::InMemory,
        };
        Ok(RegistryOptions {
            location,
            idle_ttl: Duration::from_secs(self.registry.idle_ttl_secs),
            store: StoreOptions {
                connection: self.connection_options(),
                lock_timeout: Duration::from_millis(self.storage.lock_timeout_ms),
                retry: self.retry_policy(),
                read_connection: self.storage.read_connection,
            },
        })
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}
