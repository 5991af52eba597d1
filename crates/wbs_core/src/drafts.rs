//! Local-only draft elements.
//!
//! # Responsibility
//! - Hold nodes the user created visually but has not named yet.
//! - Track which drafts have a confirming create call in flight.
//!
//! # Invariants
//! - Drafts never touch the authoritative cache.
//! - Creating, editing, or discarding a draft performs no remote call.
//! - At most one confirmation per draft may be in flight.

use crate::model::element::{ElementId, ElementPatch, ElementType, PackageId, TaskElement};
use crate::model::validation::ValidationError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// Draft map kept in insertion order.
#[derive(Debug, Default)]
pub struct DraftRegistry {
    drafts: Vec<TaskElement>,
    confirming: HashSet<ElementId>,
}

impl DraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizes a draft spanning `[now, now + duration_days]`.
    pub fn create(
        &mut self,
        package_id: PackageId,
        kind: ElementType,
        parent_id: Option<ElementId>,
        now: DateTime<Utc>,
        duration_days: i64,
    ) -> TaskElement {
        let mut draft = TaskElement::new(
            ElementId::new_draft(),
            package_id,
            kind,
            String::new(),
            now,
            now + Duration::days(duration_days.max(0)),
        )
        .with_parent(parent_id);
        draft.updated_at = Some(now);
        self.drafts.push(draft.clone());
        draft
    }

    pub fn get(&self, id: &ElementId) -> Option<&TaskElement> {
        self.drafts.iter().find(|draft| &draft.id == id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Applies a local edit. Returns the edited draft.
    pub fn edit(&mut self, id: &ElementId, patch: &ElementPatch) -> Option<TaskElement> {
        let draft = self.drafts.iter_mut().find(|draft| &draft.id == id)?;
        patch.apply_to(draft);
        Some(draft.clone())
    }

    /// Marks a draft as confirming.
    pub fn begin_confirm(&mut self, id: &ElementId) -> Result<TaskElement, ValidationError> {
        let draft = self
            .get(id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownDraft(id.clone()))?;
        if !self.confirming.insert(id.clone()) {
            return Err(ValidationError::DraftConfirmInFlight(id.clone()));
        }
        Ok(draft)
    }

    pub fn is_confirming(&self, id: &ElementId) -> bool {
        self.confirming.contains(id)
    }

    /// Removes a draft and any in-flight marker.
    pub fn remove(&mut self, id: &ElementId) -> Option<TaskElement> {
        self.confirming.remove(id);
        let index = self.drafts.iter().position(|draft| &draft.id == id)?;
        Some(self.drafts.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskElement> {
        self.drafts.iter()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}
