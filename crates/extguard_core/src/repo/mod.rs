//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the extension store contract used by the service layer.
//! - Isolate SQLite query and transaction details from business rules.
//!
//! # Invariants
//! - Storage enforces `(owner, name, category)` uniqueness on its own.
//! - Repository APIs return semantic errors (`ConstraintViolation`) in
//!   addition to DB transport errors.

pub mod extension_repo;
