//! Core engine for work breakdown structures.
//! This crate owns the hierarchy, ordering, optimistic-update, draft,
//! dependency and chart-projection rules for one task package.

pub mod config;
pub mod dependency;
pub mod drafts;
pub mod events;
pub mod gantt;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod overlay;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{EngineConfig, LoggingConfig};
pub use dependency::{DependencyGraph, PendingEdges};
pub use events::{StoreEvent, SubscriptionId};
pub use gantt::{BarShape, GanttRow, ListRow, RowTone};
pub use hierarchy::{resolve_hierarchy, HierarchyEntry, TASK_LEVEL_DEPTH};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::dependency::{DependencyEdge, DependencyType};
pub use model::element::{
    ElementId, ElementPatch, ElementType, PackageId, Priority, Status, TaskElement,
};
pub use model::record::{narrow_records, TaskElementRecord};
pub use model::validation::ValidationError;
pub use ordering::{reorder, SortOrderPatch};
pub use repo::task_repo::{
    CreateDependencyRequest, CreateTaskElementRequest, ErrorPayload, RepoError, RepoResult,
    TaskRepository,
};
pub use service::wbs_service::{
    DeleteMode, NewElement, ReorderOutcome, ServiceError, ServiceResult, WbsService,
};
pub use store::WbsStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
