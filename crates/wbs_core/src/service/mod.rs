//! WBS use-case services.
//!
//! # Responsibility
//! - Orchestrate optimistic local state and remote writes.
//! - Keep UI callers decoupled from the remote store contract.

pub mod wbs_service;
