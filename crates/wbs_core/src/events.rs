//! Store-changed notifications.
//!
//! Consumers (list view, chart) subscribe and recompute their derived views
//! when notified. Listeners run on the engine thread after the state update
//! completed, so they may read the service freely.

use crate::model::element::ElementId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Change emitted after a state update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Authoritative cache replaced by a fetch.
    Loaded { element_count: usize },
    /// Local patch entered the overlay or a draft was edited.
    PatchApplied(ElementId),
    /// Remote write for an overlay patch finished.
    PatchSettled { id: ElementId, success: bool },
    /// Reorder batch finished; `failed` counts rejected sibling writes.
    Reordered { moved: ElementId, failed: usize },
    DraftCreated(ElementId),
    DraftConfirmed { draft_id: ElementId, element_id: ElementId },
    DraftDiscarded(ElementId),
    DependencyPending { predecessor: ElementId, successor: ElementId },
    DependencySettled {
        predecessor: ElementId,
        successor: ElementId,
        success: bool,
    },
    /// Elements hidden while their delete calls run.
    DeletePending(Vec<ElementId>),
    Deleted(ElementId),
    /// Delete failed; hidden elements are visible again.
    DeleteRolledBack(Vec<ElementId>),
    ExpansionChanged,
}

/// Subscription handle used to unsubscribe.
pub type SubscriptionId = u64;

type Listener = Rc<dyn Fn(&StoreEvent)>;

/// Single-threaded listener registry.
#[derive(Default)]
pub struct EventHub {
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_id: Cell<SubscriptionId>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&StoreEvent) + 'static) -> SubscriptionId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Returns whether a listener was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Notifies a snapshot of current listeners, so a listener may subscribe
    /// or unsubscribe while being notified.
    pub fn emit(&self, event: &StoreEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }
}
