//! Remote store contract.
//!
//! # Responsibility
//! - Define the REST collaborator the engine persists through.
//! - Keep transport concerns outside the engine boundary.
//!
//! # Invariants
//! - The remote store is at-least-once and non-transactional; callers must
//!   reconcile by refetching, never by assuming a write landed.
//! - `create_task_element` never assigns `sortOrder`; it is stamped by a
//!   follow-up update.

pub mod task_repo;
