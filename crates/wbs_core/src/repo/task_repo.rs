//! Task element repository contract.
//!
//! # Responsibility
//! - Describe the remote create/update/delete/list calls and their payloads.
//! - Carry remote failures with the server's error body when present.

use crate::model::dependency::{DependencyEdge, DependencyType};
use crate::model::element::{
    ElementId, ElementPatch, ElementType, PackageId, Priority, TaskElement,
};
use crate::model::record::TaskElementRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Server error body, e.g. `{"message": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorPayload {
    /// First non-blank human-readable text in the payload.
    pub fn text(&self) -> Option<&str> {
        [self.message.as_deref(), self.error.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

/// Remote call failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// Request never produced an HTTP response.
    Transport(String),
    /// Server answered with a non-success status.
    Http {
        status: u16,
        payload: Option<ErrorPayload>,
    },
    /// Target entity does not exist remotely.
    NotFound(ElementId),
}

impl RepoError {
    /// Server-provided message, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http {
                payload: Some(payload),
                ..
            } => payload.text(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Http { status: 404, .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote store unreachable: {message}"),
            Self::Http { status, payload } => match payload.as_ref().and_then(ErrorPayload::text) {
                Some(text) => write!(f, "remote store returned {status}: {text}"),
                None => write!(f, "remote store returned {status}"),
            },
            Self::NotFound(id) => write!(f, "remote task element not found: {id}"),
        }
    }
}

impl Error for RepoError {}

/// Create payload. The server assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskElementRequest {
    pub package_id: PackageId,
    pub parent_id: Option<ElementId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementType,
    pub planned_start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    pub priority: Priority,
    pub created_by: String,
}

impl CreateTaskElementRequest {
    /// Builds the create payload for confirming `draft` under `name`.
    pub fn from_draft(draft: &TaskElement, name: String, created_by: &str) -> Self {
        Self {
            package_id: draft.package_id.clone(),
            parent_id: draft.parent_id.clone(),
            name,
            kind: draft.kind,
            planned_start_date: draft.planned_start_date,
            planned_end_date: draft.planned_end_date,
            priority: draft.priority,
            created_by: created_by.to_string(),
        }
    }
}

/// Dependency create payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDependencyRequest {
    pub predecessor_id: ElementId,
    pub successor_id: ElementId,
    #[serde(rename = "type")]
    pub kind: DependencyType,
    pub lag_days: i32,
    pub created_by: String,
}

/// Remote store for task elements of any package.
///
/// Implementations are driven from the single engine thread, so futures need
/// not be `Send`.
#[allow(async_fn_in_trait)]
pub trait TaskRepository {
    /// Creates one element. `sortOrder` is not set by this call.
    async fn create_task_element(
        &self,
        request: &CreateTaskElementRequest,
    ) -> RepoResult<TaskElementRecord>;
    /// Applies a partial update.
    async fn update_task_element(
        &self,
        id: &ElementId,
        patch: &ElementPatch,
    ) -> RepoResult<TaskElementRecord>;
    /// Deletes one element. May fail while children or edges still exist.
    async fn delete_task_element(&self, id: &ElementId) -> RepoResult<()>;
    /// Creates one dependency edge.
    async fn create_task_dependency(
        &self,
        request: &CreateDependencyRequest,
    ) -> RepoResult<DependencyEdge>;
    /// Lists a package's elements, flat or pre-nested.
    async fn list_task_elements_by_package(
        &self,
        package_id: &PackageId,
    ) -> RepoResult<Vec<TaskElementRecord>>;
}
