//! Core domain logic for extguard.
//! This crate is the single source of truth for extension flag invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::extension::{
    ExtensionCategory, ExtensionId, ExtensionRecord, ExtensionSummary, FixedExtension,
    UnknownFixedExtension,
};
pub use model::owner::{Owner, OwnerError};
pub use repo::extension_repo::{
    ExtensionRepository, ExtensionStore, RepoError, RepoResult, SqliteExtensionRepository,
    SqliteExtensionStore,
};
pub use service::extension_service::{
    normalize_extension_name, ExtensionOverview, ExtensionService, ExtensionServiceError,
    FixedExtensionState, FixedToggle, CUSTOM_NAME_MAX_CHARS, CUSTOM_QUOTA,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
