//! WBS domain model.
//!
//! # Responsibility
//! - Define the typed task element, patch, and dependency shapes used by the
//!   engine.
//! - Narrow loosely shaped remote records into typed elements at the store
//!   boundary, so internal logic never re-inspects raw payload fields.
//!
//! # Invariants
//! - Every element belongs to exactly one package.
//! - Draft elements carry a `draft:`-tagged id until confirmed.

pub mod dependency;
pub mod element;
pub mod record;
pub mod validation;
