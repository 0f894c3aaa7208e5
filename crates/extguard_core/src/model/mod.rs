//! Domain model for extension flags.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the fixed extension set closed and typo-proof.
//!
//! # Invariants
//! - Every record is scoped to exactly one `Owner`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod extension;
pub mod owner;
