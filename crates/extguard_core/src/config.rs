//! Runtime configuration resolved from environment variables.
//!
//! # Responsibility
//! - Resolve database, log, and owner-file locations for the boundary layer.
//!
//! # Invariants
//! - Blank values fall back to defaults.
//! - Every resolved path is absolute when the data directory is absolute.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const ENV_DATA_DIR: &str = "EXTGUARD_DATA_DIR";
pub const ENV_DB_PATH: &str = "EXTGUARD_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "EXTGUARD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "EXTGUARD_LOG_DIR";
pub const ENV_OWNER_FILE: &str = "EXTGUARD_OWNER_FILE";

const DEFAULT_DATA_DIR_NAME: &str = "extguard";
const DB_FILE_NAME: &str = "extguard.sqlite3";
const LOG_DIR_NAME: &str = "logs";
const OWNER_FILE_NAME: &str = "owner";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// Raw level; validated by `init_logging`.
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Where the boundary layer remembers the issued guest owner id.
    pub owner_file: PathBuf,
}

impl CoreConfig {
    /// Resolves settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to its
    /// value when set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let data_dir = read(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME));

        Self {
            db_path: read(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(DB_FILE_NAME)),
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(ENV_LOG_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(LOG_DIR_NAME)),
            owner_file: read(ENV_OWNER_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(OWNER_FILE_NAME)),
        }
    }
}
