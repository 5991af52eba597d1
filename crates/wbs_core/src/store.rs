//! WBS state container.
//!
//! # Responsibility
//! - Hold the authoritative cache and every local layer on top of it:
//!   overlay patches, drafts, pending edges, pending deletes, expansion.
//! - Derive the merged view and the projections from that state.
//!
//! # Invariants
//! - Reads fold overlay patches at the point of consumption; the cache only
//!   changes on confirmed writes or fetches.
//! - Drafts and pending deletes never enter the cache.

use crate::dependency::{DependencyGraph, PendingEdges};
use crate::drafts::DraftRegistry;
use crate::gantt::{project_gantt, project_list, GanttRow, ListRow};
use crate::hierarchy::{resolve_hierarchy, HierarchyEntry};
use crate::model::dependency::DependencyEdge;
use crate::model::element::{ElementId, ElementPatch, ElementType, PackageId, TaskElement};
use crate::overlay::{OverlayTicket, PatchOverlay};
use std::collections::HashSet;

/// State for one task package.
#[derive(Debug)]
pub struct WbsStore {
    package_id: PackageId,
    elements: Vec<TaskElement>,
    overlay: PatchOverlay,
    drafts: DraftRegistry,
    pending_edges: PendingEdges,
    pending_deletes: HashSet<ElementId>,
    expanded: HashSet<ElementId>,
    known_groups: HashSet<ElementId>,
    expand_groups_on_load: bool,
}

impl WbsStore {
    pub fn new(package_id: PackageId, expand_groups_on_load: bool) -> Self {
        Self {
            package_id,
            elements: Vec::new(),
            overlay: PatchOverlay::new(),
            drafts: DraftRegistry::new(),
            pending_edges: PendingEdges::new(),
            pending_deletes: HashSet::new(),
            expanded: HashSet::new(),
            known_groups: HashSet::new(),
            expand_groups_on_load,
        }
    }

    pub fn package_id(&self) -> &PackageId {
        &self.package_id
    }

    /// Replaces the authoritative cache with a fresh fetch.
    ///
    /// Groups seen for the first time follow `expand_groups_on_load`;
    /// expansion of known groups is preserved.
    pub fn replace_elements(&mut self, elements: Vec<TaskElement>) {
        for element in &elements {
            if element.kind == ElementType::Group
                && self.known_groups.insert(element.id.clone())
                && self.expand_groups_on_load
            {
                self.expanded.insert(element.id.clone());
            }
        }
        let live: HashSet<&ElementId> = elements.iter().map(|element| &element.id).collect();
        self.pending_deletes.retain(|id| live.contains(id));
        self.elements = elements;
    }

    /// Cached element without overlay.
    pub fn authoritative(&self, id: &ElementId) -> Option<&TaskElement> {
        self.elements.iter().find(|element| &element.id == id)
    }

    /// Element as the UI should see it: draft, or cache ⊕ overlay.
    pub fn element(&self, id: &ElementId) -> Option<TaskElement> {
        if let Some(draft) = self.drafts.get(id) {
            return Some(draft.clone());
        }
        if self.pending_deletes.contains(id) {
            return None;
        }
        self.authoritative(id).map(|element| self.overlay.view(element))
    }

    /// Persisted elements with overlay applied, minus pending deletes.
    pub fn persisted_view(&self) -> Vec<TaskElement> {
        self.elements
            .iter()
            .filter(|element| !self.pending_deletes.contains(&element.id))
            .map(|element| self.overlay.view(element))
            .collect()
    }

    /// Persisted view plus drafts.
    pub fn view_elements(&self) -> Vec<TaskElement> {
        let mut view = self.persisted_view();
        view.extend(self.drafts.iter().cloned());
        view
    }

    pub fn ordered_hierarchy(&self) -> Vec<HierarchyEntry> {
        resolve_hierarchy(&self.view_elements())
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_elements(&self.persisted_view())
    }

    pub fn gantt_rows(&self, min_span_days: i64) -> Vec<GanttRow> {
        let view = self.persisted_view();
        let graph = DependencyGraph::from_elements(&view);
        let mut all = view;
        all.extend(self.drafts.iter().cloned());
        let entries = resolve_hierarchy(&all);
        project_gantt(
            &entries,
            &self.expanded,
            &graph,
            &self.pending_edges,
            min_span_days,
        )
    }

    pub fn list_rows(&self) -> Vec<ListRow> {
        project_list(&self.ordered_hierarchy(), &self.expanded)
    }

    /// Folds a confirmed patch into the cache.
    pub fn merge_into_cache(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        match self.elements.iter_mut().find(|element| &element.id == id) {
            Some(element) => {
                patch.apply_to(element);
                true
            }
            None => false,
        }
    }

    /// Settles a successful write: drops its overlay layer and merges what
    /// is still current of its patch into the cache.
    pub fn confirm_patch(&mut self, ticket: &OverlayTicket) -> bool {
        match self.overlay.confirm(ticket) {
            Some(patch) => self.merge_into_cache(&ticket.id, &patch),
            None => false,
        }
    }

    /// Settles a failed write: drops its overlay layer only.
    pub fn discard_patch(&mut self, ticket: &OverlayTicket) -> bool {
        self.overlay.discard(ticket)
    }

    /// Inserts or replaces a cached element.
    pub fn upsert_into_cache(&mut self, element: TaskElement) {
        if element.kind == ElementType::Group
            && self.known_groups.insert(element.id.clone())
            && self.expand_groups_on_load
        {
            self.expanded.insert(element.id.clone());
        }
        match self.elements.iter_mut().find(|current| current.id == element.id) {
            Some(current) => *current = element,
            None => self.elements.push(element),
        }
    }

    pub fn remove_from_cache(&mut self, id: &ElementId) -> Option<TaskElement> {
        self.pending_deletes.remove(id);
        let index = self.elements.iter().position(|element| &element.id == id)?;
        Some(self.elements.remove(index))
    }

    /// Records a confirmed edge on both endpoints.
    pub fn attach_edge(&mut self, edge: &DependencyEdge) {
        for element in &mut self.elements {
            if element.id == edge.successor_id
                && !element
                    .predecessor_edges
                    .iter()
                    .any(|current| current.links(&edge.predecessor_id, &edge.successor_id))
            {
                element.predecessor_edges.push(edge.clone());
            }
            if element.id == edge.predecessor_id
                && !element
                    .successor_edges
                    .iter()
                    .any(|current| current.links(&edge.predecessor_id, &edge.successor_id))
            {
                element.successor_edges.push(edge.clone());
            }
        }
    }

    pub fn hide_pending_deletes(&mut self, ids: &[ElementId]) {
        self.pending_deletes.extend(ids.iter().cloned());
    }

    pub fn restore_pending_deletes(&mut self, ids: &[ElementId]) {
        for id in ids {
            self.pending_deletes.remove(id);
        }
    }

    pub fn is_pending_delete(&self, id: &ElementId) -> bool {
        self.pending_deletes.contains(id)
    }

    pub fn overlay(&self) -> &PatchOverlay {
        &self.overlay
    }

    pub fn apply_patch(&mut self, id: &ElementId, patch: &ElementPatch) -> OverlayTicket {
        self.overlay.apply(id, patch)
    }

    pub fn drafts(&self) -> &DraftRegistry {
        &self.drafts
    }

    pub fn drafts_mut(&mut self) -> &mut DraftRegistry {
        &mut self.drafts
    }

    pub fn pending_edges(&self) -> &PendingEdges {
        &self.pending_edges
    }

    pub fn pending_edges_mut(&mut self) -> &mut PendingEdges {
        &mut self.pending_edges
    }

    pub fn is_expanded(&self, id: &ElementId) -> bool {
        self.expanded.contains(id)
    }

    /// Flips a group's expansion. Returns the new state.
    pub fn toggle_group(&mut self, id: &ElementId) -> bool {
        if self.expanded.remove(id) {
            return false;
        }
        self.expanded.insert(id.clone());
        true
    }

    pub fn expand_all(&mut self) {
        let groups: Vec<ElementId> = self
            .view_elements()
            .into_iter()
            .filter(|element| element.kind == ElementType::Group)
            .map(|element| element.id)
            .collect();
        self.expanded.extend(groups);
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}
