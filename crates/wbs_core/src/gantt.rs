//! Chart and list projections over the ordered hierarchy.
//!
//! # Responsibility
//! - Filter the ordered hierarchy by group collapse state.
//! - Translate visible entries into Gantt rows and indented list rows.
//!
//! # Invariants
//! - Exactly one row per visible entry, in input order. Both projections
//!   share the same visible sequence, so list and chart stay row-aligned.
//! - Only collapsed GROUP ancestors hide a node; collapsed subgroups do not.
//! - Row color derives from `status` only; shape derives from `type` only.

use crate::dependency::{DependencyGraph, PendingEdges};
use crate::hierarchy::HierarchyEntry;
use crate::model::element::{ElementId, ElementType, Status, TaskElement};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Bar shape rendered by the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarShape {
    Bar,
    Diamond,
}

/// Status-derived row tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowTone {
    Neutral,
    Active,
    Success,
    Paused,
    Danger,
    Muted,
}

impl RowTone {
    pub fn for_status(status: Status) -> Self {
        match status {
            Status::NotStarted => Self::Neutral,
            Status::InProgress => Self::Active,
            Status::Completed => Self::Success,
            Status::OnHold => Self::Paused,
            Status::Delayed => Self::Danger,
            Status::Cancelled => Self::Muted,
        }
    }

    /// Bar fill color as `#rrggbb`.
    pub fn color_hex(self) -> &'static str {
        match self {
            Self::Neutral => "#9ca3af",
            Self::Active => "#3b82f6",
            Self::Success => "#22c55e",
            Self::Paused => "#f59e0b",
            Self::Danger => "#ef4444",
            Self::Muted => "#6b7280",
        }
    }
}

/// One chart-ready row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttRow {
    pub id: ElementId,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub progress: u8,
    pub shape: BarShape,
    pub tone: RowTone,
    /// Persisted and pending predecessor ids, deduplicated, persisted first.
    pub dependencies: Vec<ElementId>,
    pub depth: usize,
    pub parent_id: Option<ElementId>,
    pub is_draft: bool,
}

/// One indented list-view row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub id: ElementId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementType,
    pub depth: usize,
    pub sort_order: Option<i64>,
    pub is_draft: bool,
}

/// Returns whether every GROUP ancestor of `element` is expanded.
pub fn is_visible(
    element: &TaskElement,
    by_id: &HashMap<&ElementId, &TaskElement>,
    expanded: &HashSet<ElementId>,
) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = element.parent_id.as_ref();
    while let Some(parent_id) = cursor {
        if !visited.insert(parent_id) {
            break;
        }
        let Some(parent) = by_id.get(parent_id) else {
            break;
        };
        if parent.kind == ElementType::Group && !expanded.contains(&parent.id) {
            return false;
        }
        cursor = parent.parent_id.as_ref();
    }
    true
}

/// Visible entries in hierarchy order.
pub fn visible_entries<'a>(
    entries: &'a [HierarchyEntry],
    expanded: &HashSet<ElementId>,
) -> Vec<&'a HierarchyEntry> {
    let by_id: HashMap<&ElementId, &TaskElement> = entries
        .iter()
        .map(|entry| (&entry.element.id, &entry.element))
        .collect();
    entries
        .iter()
        .filter(|entry| is_visible(&entry.element, &by_id, expanded))
        .collect()
}

/// Projects visible entries into Gantt rows.
///
/// Milestones collapse to `end = start`; other rows with a zero or negative
/// span are widened to `min_span_days`.
pub fn project_gantt(
    entries: &[HierarchyEntry],
    expanded: &HashSet<ElementId>,
    graph: &DependencyGraph,
    pending: &PendingEdges,
    min_span_days: i64,
) -> Vec<GanttRow> {
    visible_entries(entries, expanded)
        .into_iter()
        .map(|entry| gantt_row(entry, graph, pending, min_span_days))
        .collect()
}

fn gantt_row(
    entry: &HierarchyEntry,
    graph: &DependencyGraph,
    pending: &PendingEdges,
    min_span_days: i64,
) -> GanttRow {
    let element = &entry.element;
    let start = element.planned_start_date;
    let (end, shape) = if element.kind == ElementType::Milestone {
        (start, BarShape::Diamond)
    } else if element.planned_end_date <= start {
        (start + Duration::days(min_span_days.max(1)), BarShape::Bar)
    } else {
        (element.planned_end_date, BarShape::Bar)
    };

    let mut seen = HashSet::new();
    let dependencies = graph
        .predecessors(&element.id)
        .into_iter()
        .map(|edge| &edge.predecessor_id)
        .chain(pending.predecessor_ids(&element.id))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect();

    GanttRow {
        id: element.id.clone(),
        name: element.name.clone(),
        start,
        end,
        progress: element.progress_percentage,
        shape,
        tone: RowTone::for_status(element.status),
        dependencies,
        depth: entry.depth,
        parent_id: element.parent_id.clone(),
        is_draft: element.is_draft,
    }
}

/// Projects visible entries into list rows.
pub fn project_list(entries: &[HierarchyEntry], expanded: &HashSet<ElementId>) -> Vec<ListRow> {
    visible_entries(entries, expanded)
        .into_iter()
        .map(|entry| ListRow {
            id: entry.element.id.clone(),
            name: entry.element.name.clone(),
            kind: entry.element.kind,
            depth: entry.depth,
            sort_order: entry.element.sort_order,
            is_draft: entry.element.is_draft,
        })
        .collect()
}
