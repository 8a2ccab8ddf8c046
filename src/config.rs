use std::path::PathBuf;

use thiserror::Error;

use crate::db::sqlite::DEFAULT_BUSY_TIMEOUT_MS;

/// Application-level constants
pub const APP_NAME: &str = "Hospital";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DB_FILE_NAME: &str = "hospital.db";

pub const ENV_DB_PATH: &str = "HOSPITAL_DB_PATH";
pub const ENV_LOG: &str = "HOSPITAL_LOG";
pub const ENV_BUSY_TIMEOUT_MS: &str = "HOSPITAL_BUSY_TIMEOUT_MS";

/// Log filter used when neither `RUST_LOG` nor `HOSPITAL_LOG` is set.
pub fn default_log_filter() -> &'static str {
    "hospital_lib=info,hospital=info,warn"
}

/// Per-user data directory, `<data_dir>/Hospital/`.
/// Falls back to the working directory on platforms without one.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join(DB_FILE_NAME)
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HospitalConfig {
    pub db_path: PathBuf,
    pub log_filter: String,
    pub busy_timeout_ms: u64,
}

impl Default for HospitalConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_filter: default_log_filter().to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl HospitalConfig {
    /// Defaults overridden by `HOSPITAL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            config.log_filter = filter;
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_BUSY_TIMEOUT_MS,
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }
}
