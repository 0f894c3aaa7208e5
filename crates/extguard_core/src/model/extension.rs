//! Extension flag domain model.
//!
//! # Responsibility
//! - Define the persisted extension record and its list projection.
//! - Define the closed set of fixed (toggle-only) extensions.
//!
//! # Invariants
//! - `(owner, name, category)` identifies at most one record.
//! - Fixed records only ever carry a `FixedExtension` name.
//! - Records are never updated in place; they are created or deleted.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Store-assigned record identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ExtensionId = i64;

/// Scope a record belongs to. Uniqueness is enforced per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionCategory {
    /// Member of the closed toggle set.
    Fixed,
    /// Free-text, validated, user-defined name.
    Custom,
}

impl ExtensionCategory {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Custom => "custom",
        }
    }

    /// Parses a storage value. Returns `None` for unknown values.
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "fixed" => Some(Self::Fixed),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl Display for ExtensionCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of fixed extensions a user may toggle.
///
/// The same set backs the reserved-name check for custom extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedExtension {
    Bat,
    Cmd,
    Com,
    Cpl,
    Exe,
    Scr,
    Js,
}

impl FixedExtension {
    /// Every fixed extension in display order.
    pub const ALL: [FixedExtension; 7] = [
        Self::Bat,
        Self::Cmd,
        Self::Com,
        Self::Cpl,
        Self::Exe,
        Self::Scr,
        Self::Js,
    ];

    /// Lowercase name used for storage and display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bat => "bat",
            Self::Cmd => "cmd",
            Self::Com => "com",
            Self::Cpl => "cpl",
            Self::Exe => "exe",
            Self::Scr => "scr",
            Self::Js => "js",
        }
    }

    /// Case-insensitive lookup. Surrounding whitespace is not trimmed.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|fixed| fixed.as_str().eq_ignore_ascii_case(value))
    }

    /// Returns whether `name` collides with a fixed extension.
    pub fn is_reserved(name: &str) -> bool {
        Self::parse(name).is_some()
    }
}

impl Display for FixedExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixedExtension {
    type Err = UnknownFixedExtension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownFixedExtension(s.to_string()))
    }
}

/// Parse error for names outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFixedExtension(pub String);

impl Display for UnknownFixedExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let expected = FixedExtension::ALL
            .iter()
            .map(|fixed| fixed.as_str())
            .collect::<Vec<_>>()
            .join("|");
        write!(f, "unknown fixed extension `{}`; expected {expected}", self.0)
    }
}

impl Error for UnknownFixedExtension {}

/// Persisted extension flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub id: ExtensionId,
    /// Opaque owner token; never interpreted by core.
    pub owner: String,
    /// Normalized extension name.
    pub name: String,
    pub category: ExtensionCategory,
    /// Unix epoch milliseconds assigned by storage. Informational only;
    /// listing order comes from `id`.
    pub created_at: i64,
}

/// List projection returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSummary {
    pub id: ExtensionId,
    pub name: String,
}

impl From<ExtensionRecord> for ExtensionSummary {
    fn from(value: ExtensionRecord) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}
