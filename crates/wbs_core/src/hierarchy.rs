//! Hierarchy resolution: flat elements to an ordered, depth-annotated list.
//!
//! # Responsibility
//! - Build the parent/child index in one pass over a flat arena.
//! - Emit an ancestor-first traversal with each node's display depth.
//!
//! # Invariants
//! - Every input id appears exactly once in the output.
//! - A parent always precedes its children.
//! - Depth is `parent + 1`, except tasks and milestones with a GROUP
//!   ancestor, which are pinned to depth 2 however many subgroups intervene.
//! - A dangling `parent_id` makes the node a root instead of dropping it.

use crate::model::element::{ElementId, ElementType, TaskElement};
use crate::ordering::compare_siblings;
use log::warn;
use std::collections::{HashMap, HashSet};

/// Display depth for task-level rows under a group.
pub const TASK_LEVEL_DEPTH: usize = 2;

/// One row of the ordered hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyEntry {
    pub element: TaskElement,
    pub depth: usize,
}

/// Resolves elements of one package into ancestor-first order.
///
/// Duplicated ids keep their first occurrence. Nodes only reachable through
/// a parent cycle are re-rooted so none are lost.
pub fn resolve_hierarchy(elements: &[TaskElement]) -> Vec<HierarchyEntry> {
    let mut by_id: HashMap<&ElementId, &TaskElement> = HashMap::with_capacity(elements.len());
    let mut unique: Vec<&TaskElement> = Vec::with_capacity(elements.len());
    for element in elements {
        if by_id.contains_key(&element.id) {
            continue;
        }
        by_id.insert(&element.id, element);
        unique.push(element);
    }

    let mut roots: Vec<&TaskElement> = Vec::new();
    let mut children_by_parent: HashMap<&ElementId, Vec<&TaskElement>> = HashMap::new();
    for &element in &unique {
        match resolvable_parent(element, &by_id) {
            Some(parent_id) => children_by_parent.entry(parent_id).or_default().push(element),
            None => roots.push(element),
        }
    }
    roots.sort_by(|a, b| compare_siblings(a, b));
    for children in children_by_parent.values_mut() {
        children.sort_by(|a, b| compare_siblings(a, b));
    }

    let mut visited: HashSet<&ElementId> = HashSet::with_capacity(unique.len());
    let mut output = Vec::with_capacity(unique.len());
    for root in roots {
        walk(root, &children_by_parent, &mut visited, &mut output);
    }

    if output.len() < unique.len() {
        let mut stranded: Vec<&TaskElement> = unique
            .iter()
            .copied()
            .filter(|element| !visited.contains(&element.id))
            .collect();
        stranded.sort_by(|a, b| compare_siblings(a, b));
        warn!(
            "event=hierarchy_cycle module=hierarchy status=error stranded_count={}",
            stranded.len()
        );
        for element in stranded {
            walk(element, &children_by_parent, &mut visited, &mut output);
        }
    }

    output
}

/// Parent id when it resolves to another element of the same package.
fn resolvable_parent<'a>(
    element: &'a TaskElement,
    by_id: &HashMap<&ElementId, &TaskElement>,
) -> Option<&'a ElementId> {
    let parent_id = element.parent_id.as_ref()?;
    if parent_id == &element.id {
        return None;
    }
    match by_id.get(parent_id) {
        Some(parent) if parent.package_id == element.package_id => Some(parent_id),
        _ => None,
    }
}

fn walk<'a>(
    root: &'a TaskElement,
    children_by_parent: &HashMap<&ElementId, Vec<&'a TaskElement>>,
    visited: &mut HashSet<&'a ElementId>,
    output: &mut Vec<HierarchyEntry>,
) {
    // (node, depth, has GROUP ancestor)
    let mut stack: Vec<(&TaskElement, usize, bool)> = vec![(root, 0, false)];
    while let Some((node, depth, under_group)) = stack.pop() {
        if !visited.insert(&node.id) {
            continue;
        }
        output.push(HierarchyEntry {
            element: node.clone(),
            depth,
        });

        let Some(children) = children_by_parent.get(&node.id) else {
            continue;
        };
        let child_under_group = under_group || node.kind == ElementType::Group;
        for &child in children.iter().rev() {
            let child_depth = if child.kind.is_leaf() && child_under_group {
                TASK_LEVEL_DEPTH
            } else {
                depth + 1
            };
            stack.push((child, child_depth, child_under_group));
        }
    }
}

/// Collects `root_id` and all its descendants, children before parents.
pub fn subtree_post_order(elements: &[TaskElement], root_id: &ElementId) -> Vec<ElementId> {
    let mut children_by_parent: HashMap<&ElementId, Vec<&TaskElement>> = HashMap::new();
    for element in elements {
        if let Some(parent_id) = element.parent_id.as_ref() {
            children_by_parent.entry(parent_id).or_default().push(element);
        }
    }
    for children in children_by_parent.values_mut() {
        children.sort_by(|a, b| compare_siblings(a, b));
    }

    let mut visited = HashSet::new();
    let mut pre_order = Vec::new();
    let mut stack = vec![root_id];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        pre_order.push(current.clone());
        if let Some(children) = children_by_parent.get(current) {
            stack.extend(children.iter().rev().copied().map(|child| &child.id));
        }
    }
    pre_order.reverse();
    pre_order
}
