//! Optimistic patch overlay.
//!
//! # Responsibility
//! - Hold local patches for elements whose remote write is still pending.
//! - Fold those patches onto authoritative elements at read time.
//!
//! # Invariants
//! - The authoritative cache is never mutated by the overlay.
//! - Pending patches fold in apply order, so the latest local value wins.
//! - Confirming a write strips its keys from every older pending patch of the
//!   same element. A late response for an older write can therefore never
//!   overwrite a newer value.
//! - Discarding a failed write removes only that write's layer.

use crate::model::element::{ElementId, ElementPatch, TaskElement};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct OverlayLayer {
    generation: u64,
    patch: ElementPatch,
}

/// Handle returned when a patch enters the overlay; used to settle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayTicket {
    pub id: ElementId,
    generation: u64,
}

/// Overlay map `element id -> pending patch layers`, oldest first.
#[derive(Debug, Default)]
pub struct PatchOverlay {
    layers: HashMap<ElementId, Vec<OverlayLayer>>,
    next_generation: u64,
}

impl PatchOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stacks `patch` on top of the pending layers for `id`.
    pub fn apply(&mut self, id: &ElementId, patch: &ElementPatch) -> OverlayTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.layers
            .entry(id.clone())
            .or_default()
            .push(OverlayLayer {
                generation,
                patch: patch.clone(),
            });
        OverlayTicket {
            id: id.clone(),
            generation,
        }
    }

    /// Removes the ticket's layer after a successful write.
    ///
    /// Returns the part of the patch that may still be merged into the cache,
    /// or `None` if the ticket was already settled.
    pub fn confirm(&mut self, ticket: &OverlayTicket) -> Option<ElementPatch> {
        let layer = self.take_layer(ticket)?;
        if let Some(layers) = self.layers.get_mut(&ticket.id) {
            for older in layers
                .iter_mut()
                .filter(|older| older.generation < ticket.generation)
            {
                older.patch.clear_keys_set_in(&layer.patch);
            }
        }
        Some(layer.patch)
    }

    /// Removes the ticket's layer after a failed write.
    ///
    /// Returns whether a layer was removed.
    pub fn discard(&mut self, ticket: &OverlayTicket) -> bool {
        self.take_layer(ticket).is_some()
    }

    fn take_layer(&mut self, ticket: &OverlayTicket) -> Option<OverlayLayer> {
        let layers = self.layers.get_mut(&ticket.id)?;
        let index = layers
            .iter()
            .position(|layer| layer.generation == ticket.generation)?;
        let layer = layers.remove(index);
        if layers.is_empty() {
            self.layers.remove(&ticket.id);
        }
        Some(layer)
    }

    /// Pending layers for `id` folded into one patch.
    pub fn get(&self, id: &ElementId) -> Option<ElementPatch> {
        let layers = self.layers.get(id)?;
        let mut merged = ElementPatch::default();
        for layer in layers {
            merged.merge(&layer.patch);
        }
        Some(merged)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.layers.contains_key(id)
    }

    /// Number of elements with at least one pending layer.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns `element ⊕ pending layers`.
    pub fn view(&self, element: &TaskElement) -> TaskElement {
        let mut view = element.clone();
        if let Some(layers) = self.layers.get(&element.id) {
            for layer in layers {
                layer.patch.apply_to(&mut view);
            }
        }
        view
    }
}
