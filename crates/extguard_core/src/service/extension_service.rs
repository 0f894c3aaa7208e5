//! Extension validation and toggle service.
//!
//! # Responsibility
//! - Normalize and validate custom extension names before persistence.
//! - Toggle fixed extensions on and off.
//! - Build the per-owner overview rendered by the boundary layer.
//!
//! # Invariants
//! - Every mutating call runs in exactly one store transaction.
//! - Validation failures perform no mutation; the first failing rule wins.
//! - A racing duplicate insert is reported as `DuplicateName`, never as an
//!   infrastructure failure.

use crate::model::extension::{
    ExtensionCategory, ExtensionId, ExtensionRecord, ExtensionSummary, FixedExtension,
};
use crate::model::owner::Owner;
use crate::repo::extension_repo::{ExtensionRepository, ExtensionStore, RepoError};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum custom extension length, in Unicode scalar values (`char`s).
///
/// Counting `char`s rather than UTF-16 code units only changes which error
/// wins for non-ASCII input: 11 emoji are 11 chars (under the limit, so the
/// character rule rejects them) but 22 UTF-16 units. Accepted names are
/// always ASCII, where both counts agree.
pub const CUSTOM_NAME_MAX_CHARS: usize = 20;
/// Custom quota. Insertion is refused only once the existing count exceeds it.
pub const CUSTOM_QUOTA: u32 = 200;

static CUSTOM_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid custom name regex"));

/// Service error for extension use-cases.
#[derive(Debug)]
pub enum ExtensionServiceError {
    EmptyInput,
    NameTooLong,
    InvalidCharacters,
    ReservedName,
    DuplicateName,
    QuotaExceeded,
    /// Persistence-layer failure, propagated unchanged.
    Repo(RepoError),
}

impl ExtensionServiceError {
    /// Whether this is a business rule rejection with a displayable message.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repo(_))
    }

    /// Stable machine-readable reason used in log events.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::NameTooLong => "name_too_long",
            Self::InvalidCharacters => "invalid_characters",
            Self::ReservedName => "reserved_name",
            Self::DuplicateName => "duplicate_name",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Repo(_) => "repo_error",
        }
    }
}

impl Display for ExtensionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Please enter an extension."),
            Self::NameTooLong => write!(
                f,
                "Custom extensions must be at most {CUSTOM_NAME_MAX_CHARS} characters long."
            ),
            Self::InvalidCharacters => write!(
                f,
                "Extensions may only contain lowercase letters, digits, '-' and '_'."
            ),
            Self::ReservedName => write!(f, "This extension is one of the fixed extensions."),
            Self::DuplicateName => write!(f, "This extension is already registered."),
            Self::QuotaExceeded => write!(
                f,
                "You can register at most {CUSTOM_QUOTA} custom extensions."
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExtensionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ExtensionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ConstraintViolation { .. } => Self::DuplicateName,
            other => Self::Repo(other),
        }
    }
}

/// Outcome of a fixed extension toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedToggle {
    /// Record created.
    Checked,
    /// Record removed.
    Unchecked,
}

/// Fixed extension with its checked state for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedExtensionState {
    pub extension: FixedExtension,
    pub checked: bool,
}

/// Read-only view of everything one owner has configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionOverview {
    /// Every fixed extension, in `FixedExtension::ALL` order.
    pub fixed: Vec<FixedExtensionState>,
    /// Custom extensions in insertion order.
    pub custom: Vec<ExtensionSummary>,
}

/// Extension service facade over a transactional store.
pub struct ExtensionService<S: ExtensionStore> {
    store: S,
}

impl<S: ExtensionStore> ExtensionService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists one owner's records in a category.
    pub fn list_by_owner_and_category(
        &mut self,
        owner: &Owner,
        category: ExtensionCategory,
    ) -> Result<Vec<ExtensionSummary>, ExtensionServiceError> {
        self.store
            .in_read_transaction(|repo| Ok(repo.list(owner.as_str(), category)?))
    }

    /// Flips one fixed extension for `owner`.
    ///
    /// Repeated calls alternate between `Checked` and `Unchecked`.
    pub fn toggle_fixed(
        &mut self,
        owner: &Owner,
        extension: FixedExtension,
    ) -> Result<FixedToggle, ExtensionServiceError> {
        let name = extension.as_str();
        let result: Result<FixedToggle, ExtensionServiceError> =
            self.store.in_transaction(|repo| {
                let owner = owner.as_str();
                if repo.exists(owner, name, ExtensionCategory::Fixed)? {
                    repo.delete_by_name_owner_category(owner, name, ExtensionCategory::Fixed)?;
                    Ok(FixedToggle::Unchecked)
                } else {
                    repo.save(owner, name, ExtensionCategory::Fixed)?;
                    Ok(FixedToggle::Checked)
                }
            });

        match &result {
            Ok(state) => info!(
                "event=fixed_toggle module=service status=ok extension={name} state={}",
                match state {
                    FixedToggle::Checked => "checked",
                    FixedToggle::Unchecked => "unchecked",
                }
            ),
            Err(err) => log_failure("fixed_toggle", err),
        }
        result
    }

    /// Validates `raw` and stores it as a custom extension.
    ///
    /// # Errors
    /// Returns the first failing rule, in this order: `EmptyInput`,
    /// `NameTooLong`, `InvalidCharacters`, `ReservedName`, `DuplicateName`,
    /// `QuotaExceeded`.
    pub fn add_custom(
        &mut self,
        owner: &Owner,
        raw: &str,
    ) -> Result<ExtensionRecord, ExtensionServiceError> {
        let result = validate_custom_shape(raw).and_then(|normalized| {
            self.store.in_transaction(|repo| {
                ensure_insertable(repo, owner, &normalized)?;
                Ok(repo.save(owner.as_str(), &normalized, ExtensionCategory::Custom)?)
            })
        });

        match &result {
            Ok(record) => info!(
                "event=custom_add module=service status=ok extension_id={}",
                record.id
            ),
            Err(err) => log_failure("custom_add", err),
        }
        result
    }

    /// Deletes one custom extension owned by `owner`.
    ///
    /// Missing ids and ids owned by someone else are silently ignored.
    pub fn delete_custom(
        &mut self,
        owner: &Owner,
        id: ExtensionId,
    ) -> Result<(), ExtensionServiceError> {
        let result: Result<(), ExtensionServiceError> = self
            .store
            .in_transaction(|repo| Ok(repo.delete_by_id_and_owner(id, owner.as_str())?));

        match &result {
            Ok(()) => info!("event=custom_delete module=service status=ok extension_id={id}"),
            Err(err) => log_failure("custom_delete", err),
        }
        result
    }

    /// Builds the fixed checklist and custom list for one owner.
    pub fn overview(&mut self, owner: &Owner) -> Result<ExtensionOverview, ExtensionServiceError> {
        self.store.in_read_transaction(|repo| {
            let checked = repo.list(owner.as_str(), ExtensionCategory::Fixed)?;
            let fixed = FixedExtension::ALL
                .into_iter()
                .map(|extension| FixedExtensionState {
                    extension,
                    checked: checked.iter().any(|item| item.name == extension.as_str()),
                })
                .collect();
            let custom = repo.list(owner.as_str(), ExtensionCategory::Custom)?;
            Ok(ExtensionOverview { fixed, custom })
        })
    }
}

/// Normalizes a raw custom extension name.
///
/// Returns `None` for empty or all-whitespace input. Otherwise trims, removes
/// every remaining whitespace character and every `.`, then lowercases.
pub fn normalize_extension_name(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }

    let normalized = raw
        .trim()
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '.')
        .collect::<String>()
        .to_lowercase();
    Some(normalized)
}

/// Storage-independent checks (rules 1 to 4).
fn validate_custom_shape(raw: &str) -> Result<String, ExtensionServiceError> {
    let normalized = normalize_extension_name(raw).unwrap_or_default();

    if normalized.is_empty() {
        return Err(ExtensionServiceError::EmptyInput);
    }
    if normalized.chars().count() > CUSTOM_NAME_MAX_CHARS {
        return Err(ExtensionServiceError::NameTooLong);
    }
    if !CUSTOM_NAME_RE.is_match(&normalized) {
        return Err(ExtensionServiceError::InvalidCharacters);
    }
    if FixedExtension::is_reserved(&normalized) {
        return Err(ExtensionServiceError::ReservedName);
    }
    Ok(normalized)
}

/// Storage-dependent checks (rules 5 and 6).
fn ensure_insertable(
    repo: &dyn ExtensionRepository,
    owner: &Owner,
    normalized: &str,
) -> Result<(), ExtensionServiceError> {
    if repo.exists(owner.as_str(), normalized, ExtensionCategory::Custom)? {
        return Err(ExtensionServiceError::DuplicateName);
    }
    // Strict `>` on the pre-insert count: up to 201 records can exist.
    if repo.count(owner.as_str(), ExtensionCategory::Custom)? > CUSTOM_QUOTA {
        return Err(ExtensionServiceError::QuotaExceeded);
    }
    Ok(())
}

fn log_failure(event: &str, err: &ExtensionServiceError) {
    if err.is_user_facing() {
        info!(
            "event={event} module=service status=rejected reason={}",
            err.reason_code()
        );
    } else {
        warn!("event={event} module=service status=error error={err}");
    }
}
