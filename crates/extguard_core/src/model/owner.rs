//! Opaque owner token.
//!
//! Owners are issued by the boundary layer (a per-browser guest id) and are
//! only ever compared for equality by core.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Non-empty owner identifier scoping every extension record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Owner(String);

impl Owner {
    /// Accepts any non-empty token and keeps it byte for byte.
    pub fn parse(value: &str) -> Result<Self, OwnerError> {
        if value.is_empty() {
            return Err(OwnerError::Empty);
        }
        Ok(Self(value.to_string()))
    }

    /// Issues a fresh guest identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerError {
    Empty,
}

impl Display for OwnerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "owner id cannot be empty"),
        }
    }
}

impl Error for OwnerError {}
