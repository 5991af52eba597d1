//! Task element domain model.
//!
//! # Responsibility
//! - Define the canonical WBS node shared by the list view and the Gantt view.
//! - Define partial patches and how they fold onto an element.
//!
//! # Invariants
//! - `type` decides legal parentage: groups are roots, subgroups nest under
//!   groups or subgroups, tasks and milestones nest under groups or subgroups.
//! - A milestone always has `planned_end_date == planned_start_date`.
//! - `progress_percentage` is clamped to `0..=100`.

use crate::model::dependency::DependencyEdge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DRAFT_ID_PREFIX: &str = "draft:";

/// Upper bound for `progress_percentage`.
pub const MAX_PROGRESS: u8 = 100;

/// Element identity.
///
/// Persisted elements carry the remote id verbatim. Drafts carry a locally
/// generated `draft:<uuid>` id that is never sent to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh, locally unique draft id.
    pub fn new_draft() -> Self {
        Self(format!("{DRAFT_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_draft(&self) -> bool {
        self.0.starts_with(DRAFT_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Owning task package identity. Elements never cross packages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PackageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// WBS node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    /// Top-level work package grouping.
    Group,
    /// Grouping nested under a group or another subgroup.
    Subgroup,
    /// Leaf task rendered as a bar.
    SimpleTask,
    /// Leaf task rendered as a diamond; zero duration.
    Milestone,
}

impl ElementType {
    /// Display rank among mixed-type siblings under one parent.
    ///
    /// Tasks and milestones share a rank so they interleave by `sort_order`,
    /// even though each kind is numbered in its own bucket.
    pub fn type_priority(self) -> u8 {
        match self {
            Self::Group => 0,
            Self::Subgroup => 1,
            Self::SimpleTask | Self::Milestone => 2,
        }
    }

    /// Returns whether this kind is a leaf (task-level) node.
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::SimpleTask | Self::Milestone)
    }

    /// Returns whether a node of this kind may sit under `parent`.
    ///
    /// `None` means root level.
    pub fn can_nest_under(self, parent: Option<ElementType>) -> bool {
        match (self, parent) {
            (Self::Group, None) => true,
            (Self::Group, Some(_)) => false,
            (_, None) => false,
            (_, Some(parent)) => matches!(parent, Self::Group | Self::Subgroup),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "GROUP",
            Self::Subgroup => "SUBGROUP",
            Self::SimpleTask => "SIMPLE_TASK",
            Self::Milestone => "MILESTONE",
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation-only priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Presentation-only lifecycle status. Drives Gantt row color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    OnHold,
    Delayed,
    Cancelled,
}

/// Canonical WBS node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskElement {
    pub id: ElementId,
    /// Empty for a fresh draft until the user commits a value.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementType,
    /// `None` means root level.
    pub parent_id: Option<ElementId>,
    pub package_id: PackageId,
    pub planned_start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    pub priority: Priority,
    pub status: Status,
    /// Dense `1..n` within a sibling bucket. `None` until stamped after create.
    pub sort_order: Option<i64>,
    pub progress_percentage: u8,
    pub is_draft: bool,
    pub predecessor_edges: Vec<DependencyEdge>,
    pub successor_edges: Vec<DependencyEdge>,
    pub comments_count: u32,
    pub assignee_refs: Vec<String>,
    /// Last-modified timestamp, used as an ordering tiebreak.
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskElement {
    /// Creates a persisted-shape element with default presentation fields.
    pub fn new(
        id: ElementId,
        package_id: PackageId,
        kind: ElementType,
        name: impl Into<String>,
        planned_start_date: DateTime<Utc>,
        planned_end_date: DateTime<Utc>,
    ) -> Self {
        let mut element = Self {
            is_draft: id.is_draft(),
            id,
            name: name.into(),
            kind,
            parent_id: None,
            package_id,
            planned_start_date,
            planned_end_date,
            priority: Priority::default(),
            status: Status::default(),
            sort_order: None,
            progress_percentage: 0,
            predecessor_edges: Vec::new(),
            successor_edges: Vec::new(),
            comments_count: 0,
            assignee_refs: Vec::new(),
            updated_at: None,
        };
        element.normalize();
        element
    }

    pub fn with_parent(mut self, parent_id: Option<ElementId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    /// Enforces kind-specific field rules in place.
    pub fn normalize(&mut self) {
        self.progress_percentage = self.progress_percentage.min(MAX_PROGRESS);
        if self.kind == ElementType::Milestone {
            self.planned_end_date = self.planned_start_date;
        }
    }
}

/// Clamps a remote progress value into `0..=100`.
pub fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(MAX_PROGRESS)) as u8
}

/// Partial element update.
///
/// Serialized as the remote update payload: unset fields are omitted, and
/// `parent_id: Some(None)` is sent as an explicit `null` (move to root).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<ElementId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
}

impl ElementPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn sort_order(sort_order: i64) -> Self {
        Self {
            sort_order: Some(sort_order),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Folds a later patch over this one; keys set in `later` win.
    pub fn merge(&mut self, later: &ElementPatch) {
        if let Some(value) = &later.name {
            self.name = Some(value.clone());
        }
        if let Some(value) = &later.parent_id {
            self.parent_id = Some(value.clone());
        }
        if let Some(value) = later.planned_start_date {
            self.planned_start_date = Some(value);
        }
        if let Some(value) = later.planned_end_date {
            self.planned_end_date = Some(value);
        }
        if let Some(value) = later.priority {
            self.priority = Some(value);
        }
        if let Some(value) = later.status {
            self.status = Some(value);
        }
        if let Some(value) = later.sort_order {
            self.sort_order = Some(value);
        }
        if let Some(value) = later.progress_percentage {
            self.progress_percentage = Some(value);
        }
    }

    /// Unsets every key that `newer` sets.
    pub fn clear_keys_set_in(&mut self, newer: &ElementPatch) {
        if newer.name.is_some() {
            self.name = None;
        }
        if newer.parent_id.is_some() {
            self.parent_id = None;
        }
        if newer.planned_start_date.is_some() {
            self.planned_start_date = None;
        }
        if newer.planned_end_date.is_some() {
            self.planned_end_date = None;
        }
        if newer.priority.is_some() {
            self.priority = None;
        }
        if newer.status.is_some() {
            self.status = None;
        }
        if newer.sort_order.is_some() {
            self.sort_order = None;
        }
        if newer.progress_percentage.is_some() {
            self.progress_percentage = None;
        }
    }

    /// Applies set keys onto `element`, then re-normalizes it.
    pub fn apply_to(&self, element: &mut TaskElement) {
        if let Some(value) = &self.name {
            element.name = value.clone();
        }
        if let Some(value) = &self.parent_id {
            element.parent_id = value.clone();
        }
        if let Some(value) = self.planned_start_date {
            element.planned_start_date = value;
        }
        if let Some(value) = self.planned_end_date {
            element.planned_end_date = value;
        }
        if let Some(value) = self.priority {
            element.priority = value;
        }
        if let Some(value) = self.status {
            element.status = value;
        }
        if let Some(value) = self.sort_order {
            element.sort_order = Some(value);
        }
        if let Some(value) = self.progress_percentage {
            element.progress_percentage = value;
        }
        element.normalize();
    }

    /// Returns a copy adjusted to the kind rules of `target`.
    ///
    /// Progress is clamped. For milestones the end date always follows the
    /// start date, so a start change drags the end along and an end-only
    /// change is pinned back to the current start.
    pub fn normalized_for(&self, target: &TaskElement) -> ElementPatch {
        let mut patch = self.clone();
        patch.progress_percentage = patch.progress_percentage.map(|value| value.min(MAX_PROGRESS));
        if target.kind == ElementType::Milestone {
            match (patch.planned_start_date, patch.planned_end_date) {
                (Some(start), _) => patch.planned_end_date = Some(start),
                (None, Some(_)) => patch.planned_end_date = Some(target.planned_start_date),
                (None, None) => {}
            }
        }
        patch
    }
}
