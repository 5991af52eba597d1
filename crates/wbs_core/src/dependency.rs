//! Dependency graph resolution.
//!
//! # Responsibility
//! - Collect edges from both sides' payloads and coalesce duplicates.
//! - Answer predecessor/successor/candidate queries per node.
//! - Hold pending (not yet confirmed) edges keyed by successor.
//!
//! # Invariants
//! - No self-loops are ever returned or created.
//! - An ordered `(predecessor, successor)` pair is linked at most once
//!   across persisted and pending edges.

use crate::model::dependency::DependencyEdge;
use crate::model::element::{ElementId, TaskElement};
use crate::model::validation::ValidationError;
use log::warn;
use std::collections::{HashMap, HashSet};

/// Deduplicated edge set for one package.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Collects edges from every element's predecessor and successor lists.
    ///
    /// An edge is a duplicate if its derived key or its `pred->succ:type`
    /// pair key was already seen, so the same edge reported with an id on one
    /// side and without on the other still collapses to one.
    pub fn from_elements<'a>(elements: impl IntoIterator<Item = &'a TaskElement>) -> Self {
        let mut seen_keys = HashSet::new();
        let mut seen_pairs = HashSet::new();
        let mut edges = Vec::new();
        for element in elements {
            for edge in element
                .predecessor_edges
                .iter()
                .chain(element.successor_edges.iter())
            {
                if edge.is_self_loop() {
                    warn!(
                        "event=dependency_skipped module=dependency status=skipped reason=self_loop element_id={}",
                        edge.predecessor_id
                    );
                    continue;
                }
                let key_is_new = seen_keys.insert(edge.key());
                let pair_is_new = seen_pairs.insert(edge.pair_key());
                if key_is_new && pair_is_new {
                    edges.push(edge.clone());
                }
            }
        }
        Self { edges }
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Edges whose successor is `id`.
    pub fn predecessors(&self, id: &ElementId) -> Vec<&DependencyEdge> {
        self.edges
            .iter()
            .filter(|edge| &edge.successor_id == id)
            .collect()
    }

    /// Edges whose predecessor is `id`.
    pub fn successors(&self, id: &ElementId) -> Vec<&DependencyEdge> {
        self.edges
            .iter()
            .filter(|edge| &edge.predecessor_id == id)
            .collect()
    }

    pub fn contains_pair(&self, predecessor: &ElementId, successor: &ElementId) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.links(predecessor, successor))
    }
}

/// Elements eligible as the other end of a new link from `node`.
///
/// Every persisted element of the same package except `node` itself.
pub fn dependency_candidates<'a>(
    elements: &'a [TaskElement],
    node: &TaskElement,
) -> Vec<&'a TaskElement> {
    elements
        .iter()
        .filter(|element| element.id != node.id)
        .filter(|element| element.package_id == node.package_id)
        .filter(|element| !element.is_draft)
        .collect()
}

/// Transient edges awaiting remote confirmation, keyed by successor.
#[derive(Debug, Default)]
pub struct PendingEdges {
    by_successor: HashMap<ElementId, Vec<DependencyEdge>>,
}

impl PendingEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, edge: DependencyEdge) {
        self.by_successor
            .entry(edge.successor_id.clone())
            .or_default()
            .push(edge);
    }

    /// Removes the pending edge for the pair. Returns whether one existed.
    pub fn remove(&mut self, predecessor: &ElementId, successor: &ElementId) -> bool {
        let Some(edges) = self.by_successor.get_mut(successor) else {
            return false;
        };
        let before = edges.len();
        edges.retain(|edge| &edge.predecessor_id != predecessor);
        let removed = edges.len() != before;
        if edges.is_empty() {
            self.by_successor.remove(successor);
        }
        removed
    }

    pub fn contains_pair(&self, predecessor: &ElementId, successor: &ElementId) -> bool {
        self.by_successor
            .get(successor)
            .is_some_and(|edges| edges.iter().any(|edge| &edge.predecessor_id == predecessor))
    }

    /// Pending predecessor ids for `successor`, in insertion order.
    pub fn predecessor_ids(&self, successor: &ElementId) -> Vec<&ElementId> {
        self.by_successor
            .get(successor)
            .map(|edges| edges.iter().map(|edge| &edge.predecessor_id).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_successor.is_empty()
    }
}

/// Checks a proposed `predecessor -> successor` link against both the
/// persisted graph and pending edges.
pub fn validate_new_edge(
    graph: &DependencyGraph,
    pending: &PendingEdges,
    predecessor: &ElementId,
    successor: &ElementId,
) -> Result<(), ValidationError> {
    if predecessor == successor {
        return Err(ValidationError::SelfDependency(predecessor.clone()));
    }
    if graph.contains_pair(predecessor, successor) || pending.contains_pair(predecessor, successor)
    {
        return Err(ValidationError::DuplicateDependency {
            predecessor: predecessor.clone(),
            successor: successor.clone(),
        });
    }
    Ok(())
}
