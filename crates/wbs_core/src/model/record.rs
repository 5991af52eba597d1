//! Remote task element records and boundary narrowing.
//!
//! # Responsibility
//! - Accept the loosely shaped JSON the remote store returns: flat lists,
//!   pre-nested `children[]`, explicit edge lists, or a generic incident list.
//! - Narrow every record into a flat, typed `TaskElement` exactly once.
//!
//! # Invariants
//! - Output contains each id at most once (first occurrence wins).
//! - Records belonging to another package are dropped.
//! - Nested children inherit `parentId` and `packageId` when absent.

use crate::model::dependency::DependencyEdge;
use crate::model::element::{
    clamp_progress, ElementId, ElementType, PackageId, Priority, Status, TaskElement,
};
use crate::model::validation::ValidationError;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Task element as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskElementRecord {
    pub id: ElementId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ElementType,
    #[serde(default)]
    pub parent_id: Option<ElementId>,
    #[serde(default)]
    pub package_id: Option<PackageId>,
    #[serde(default)]
    pub planned_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub planned_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub predecessor_edges: Vec<DependencyEdge>,
    #[serde(default)]
    pub successor_edges: Vec<DependencyEdge>,
    /// Generic incident-edge list; direction is derived from this record's id.
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default)]
    pub comments_count: Option<u32>,
    #[serde(default)]
    pub assignee_refs: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub children: Vec<TaskElementRecord>,
}

/// Flattens flat or nested records for one package into typed elements.
///
/// `fetched_at` fills missing planned dates so a partially populated record
/// is still rendered instead of dropped.
pub fn narrow_records(
    records: Vec<TaskElementRecord>,
    package_id: &PackageId,
    fetched_at: DateTime<Utc>,
) -> Vec<TaskElement> {
    let mut seen = HashSet::new();
    let mut output = Vec::new();
    let mut stack: Vec<(TaskElementRecord, Option<ElementId>, Option<PackageId>)> = records
        .into_iter()
        .rev()
        .map(|record| (record, None, None))
        .collect();

    while let Some((mut record, inherited_parent, inherited_package)) = stack.pop() {
        let children = std::mem::take(&mut record.children);
        let record_package = record
            .package_id
            .clone()
            .or(inherited_package)
            .unwrap_or_else(|| package_id.clone());

        if &record_package != package_id {
            warn!(
                "event=record_skipped module=model status=skipped reason=foreign_package element_id={} package_id={}",
                record.id, record_package
            );
            continue;
        }

        let record_id = record.id.clone();
        for child in children.into_iter().rev() {
            stack.push((child, Some(record_id.clone()), Some(record_package.clone())));
        }

        if !seen.insert(record_id.clone()) {
            continue;
        }
        output.push(into_element(record, inherited_parent, record_package, fetched_at));
    }

    output
}

/// Narrows one standalone record, e.g. a create response.
///
/// Nested children, if any, are ignored.
pub fn narrow_record(
    mut record: TaskElementRecord,
    package_id: &PackageId,
    fetched_at: DateTime<Utc>,
) -> Result<TaskElement, ValidationError> {
    record.children.clear();
    let record_package = record
        .package_id
        .clone()
        .unwrap_or_else(|| package_id.clone());
    if &record_package != package_id {
        return Err(ValidationError::InvalidRecord(format!(
            "element {} belongs to package {record_package}, expected {package_id}",
            record.id
        )));
    }
    Ok(into_element(record, None, record_package, fetched_at))
}

fn into_element(
    record: TaskElementRecord,
    inherited_parent: Option<ElementId>,
    package_id: PackageId,
    fetched_at: DateTime<Utc>,
) -> TaskElement {
    let start = record
        .planned_start_date
        .or(record.planned_end_date)
        .unwrap_or(fetched_at);
    let end = record.planned_end_date.unwrap_or(start);

    let mut predecessor_edges = record.predecessor_edges;
    let mut successor_edges = record.successor_edges;
    for edge in record.dependencies {
        if edge.successor_id == record.id {
            predecessor_edges.push(edge);
        } else if edge.predecessor_id == record.id {
            successor_edges.push(edge);
        }
    }
    dedup_edges(&mut predecessor_edges);
    dedup_edges(&mut successor_edges);

    let mut element = TaskElement {
        is_draft: record.id.is_draft(),
        id: record.id,
        name: record.name.unwrap_or_default().trim().to_string(),
        kind: record.kind,
        parent_id: record.parent_id.or(inherited_parent),
        package_id,
        planned_start_date: start,
        planned_end_date: end,
        priority: record.priority.unwrap_or_default(),
        status: record.status.unwrap_or_default(),
        sort_order: record.sort_order,
        progress_percentage: record.progress_percentage.map(clamp_progress).unwrap_or(0),
        predecessor_edges,
        successor_edges,
        comments_count: record.comments_count.unwrap_or(0),
        assignee_refs: record.assignee_refs,
        updated_at: record.updated_at,
    };
    element.normalize();
    element
}

fn dedup_edges(edges: &mut Vec<DependencyEdge>) {
    let mut seen = HashSet::new();
    edges.retain(|edge| seen.insert(edge.pair_key()));
}
