//! Core use-case services.
//!
//! # Responsibility
//! - Enforce business rules before delegating to the extension store.
//! - Keep the boundary layer decoupled from storage details.

pub mod extension_service;
