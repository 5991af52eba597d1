//! Sibling order management.
//!
//! # Responsibility
//! - Compute display order among siblings.
//! - Assign `sort_order` on append and recompute it after drag-and-drop.
//! - Validate placement (parentage, package, cycles) before any write.
//!
//! # Invariants
//! - A sibling bucket is `(package_id, parent_id, type)`; orders are dense
//!   `1..n` within the bucket after a reorder into it.
//! - A cross-parent move reindexes only the target bucket. The source bucket
//!   keeps its gap until its own next reorder.
//! - `reorder` is pure: it returns patches and never mutates its input.

use crate::model::element::{ElementId, ElementPatch, ElementType, PackageId, TaskElement};
use crate::model::validation::ValidationError;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Key of the set of siblings sharing one dense order sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiblingBucket {
    pub package_id: PackageId,
    pub parent_id: Option<ElementId>,
    pub kind: ElementType,
}

impl SiblingBucket {
    pub fn of(element: &TaskElement) -> Self {
        Self {
            package_id: element.package_id.clone(),
            parent_id: element.parent_id.clone(),
            kind: element.kind,
        }
    }

    pub fn contains(&self, element: &TaskElement) -> bool {
        element.package_id == self.package_id
            && element.parent_id == self.parent_id
            && element.kind == self.kind
    }
}

/// Display comparator for siblings under one parent.
///
/// Type rank first, then `sort_order` (unstamped last), then last-modified
/// time, then name. Tasks and milestones share a rank but keep separate
/// `sort_order` buckets, so a task and a milestone may both hold order 1
/// under one parent; the interleave is intended and the tiebreaks settle it.
pub fn compare_siblings(a: &TaskElement, b: &TaskElement) -> Ordering {
    a.kind
        .type_priority()
        .cmp(&b.kind.type_priority())
        .then_with(|| order_key(a).cmp(&order_key(b)))
        .then_with(|| a.updated_at.cmp(&b.updated_at))
        .then_with(|| a.name.cmp(&b.name))
}

fn order_key(element: &TaskElement) -> i64 {
    element.sort_order.unwrap_or(i64::MAX)
}

/// Returns bucket members in display order.
pub fn bucket_members<'a>(
    elements: &'a [TaskElement],
    bucket: &SiblingBucket,
) -> Vec<&'a TaskElement> {
    let mut members: Vec<&TaskElement> = elements
        .iter()
        .filter(|element| bucket.contains(element))
        .collect();
    members.sort_by(|a, b| compare_siblings(a, b));
    members
}

/// Append rule: `max(existing order) + 1`, with unstamped siblings counted
/// as `0`.
pub fn next_sort_order(elements: &[TaskElement], bucket: &SiblingBucket) -> i64 {
    elements
        .iter()
        .filter(|element| bucket.contains(element))
        .map(|element| element.sort_order.unwrap_or(0))
        .max()
        .unwrap_or(0)
        + 1
}

/// One element write produced by [`reorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrderPatch {
    pub id: ElementId,
    pub sort_order: i64,
    /// `Some(new_parent)` only for the moved element when its parent changed.
    pub parent_change: Option<Option<ElementId>>,
}

impl SortOrderPatch {
    pub fn to_element_patch(&self) -> ElementPatch {
        ElementPatch {
            sort_order: Some(self.sort_order),
            parent_id: self.parent_change.clone(),
            ..ElementPatch::default()
        }
    }
}

/// Computes the writes for moving `moved_id` to `new_index` among the
/// same-type children of `new_parent_id`.
///
/// `new_index` is clamped to `0..=sibling_count`. Only members whose order or
/// parent actually changes get a patch, so an in-place drop yields nothing.
pub fn reorder(
    elements: &[TaskElement],
    moved_id: &ElementId,
    new_parent_id: Option<&ElementId>,
    new_index: usize,
) -> Result<Vec<SortOrderPatch>, ValidationError> {
    if moved_id.is_draft() {
        return Err(ValidationError::DraftNotPersisted(moved_id.clone()));
    }
    let moved = elements
        .iter()
        .find(|element| &element.id == moved_id)
        .ok_or_else(|| ValidationError::UnknownElement(moved_id.clone()))?;

    validate_placement(elements, moved.kind, &moved.package_id, new_parent_id)?;
    if let Some(parent_id) = new_parent_id {
        ensure_not_descendant(elements, moved_id, parent_id)?;
    }

    let bucket = SiblingBucket {
        package_id: moved.package_id.clone(),
        parent_id: new_parent_id.cloned(),
        kind: moved.kind,
    };
    let mut members: Vec<&TaskElement> = bucket_members(elements, &bucket)
        .into_iter()
        .filter(|element| &element.id != moved_id)
        .collect();
    let index = new_index.min(members.len());
    members.insert(index, moved);

    let parent_changed = moved.parent_id.as_ref() != new_parent_id;
    let mut patches = Vec::new();
    for (position, member) in members.into_iter().enumerate() {
        let sort_order = position as i64 + 1;
        let parent_change = if parent_changed && &member.id == moved_id {
            Some(new_parent_id.cloned())
        } else {
            None
        };
        if member.sort_order != Some(sort_order) || parent_change.is_some() {
            patches.push(SortOrderPatch {
                id: member.id.clone(),
                sort_order,
                parent_change,
            });
        }
    }
    Ok(patches)
}

/// Checks that a `kind` node may be placed under `parent_id` in `package_id`.
///
/// The parent must be a persisted element of the same package whose type
/// admits `kind` as a child.
pub fn validate_placement(
    elements: &[TaskElement],
    kind: ElementType,
    package_id: &PackageId,
    parent_id: Option<&ElementId>,
) -> Result<(), ValidationError> {
    let Some(parent_id) = parent_id else {
        if kind.can_nest_under(None) {
            return Ok(());
        }
        return Err(ValidationError::IllegalParent {
            kind,
            parent_kind: None,
        });
    };

    if parent_id.is_draft() {
        return Err(ValidationError::DraftNotPersisted(parent_id.clone()));
    }
    let parent = elements
        .iter()
        .find(|element| &element.id == parent_id)
        .ok_or_else(|| ValidationError::UnknownParent(parent_id.clone()))?;
    if &parent.package_id != package_id {
        return Err(ValidationError::CrossPackage {
            element: parent_id.clone(),
            expected: package_id.clone(),
            actual: parent.package_id.clone(),
        });
    }
    if !kind.can_nest_under(Some(parent.kind)) {
        return Err(ValidationError::IllegalParent {
            kind,
            parent_kind: Some(parent.kind),
        });
    }
    Ok(())
}

/// Rejects placing `node_id` under `candidate_parent_id` when the candidate
/// lies in the node's own subtree.
pub fn ensure_not_descendant(
    elements: &[TaskElement],
    node_id: &ElementId,
    candidate_parent_id: &ElementId,
) -> Result<(), ValidationError> {
    let parents: HashMap<&ElementId, Option<&ElementId>> = elements
        .iter()
        .map(|element| (&element.id, element.parent_id.as_ref()))
        .collect();

    let mut visited = HashSet::new();
    let mut cursor = Some(candidate_parent_id);
    while let Some(current) = cursor {
        if current == node_id || !visited.insert(current) {
            return Err(ValidationError::CycleDetected {
                node: node_id.clone(),
                parent: candidate_parent_id.clone(),
            });
        }
        cursor = parents.get(current).copied().flatten();
    }
    Ok(())
}
