//! Precondition failures rejected before any remote call.

use crate::model::element::{ElementId, ElementType, PackageId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Local validation errors. None of these leave a state change behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Element is not present in the current view.
    UnknownElement(ElementId),
    /// Referenced parent is not present in the current view.
    UnknownParent(ElementId),
    /// Draft id does not refer to a live draft.
    UnknownDraft(ElementId),
    /// Name is blank after trim.
    BlankName,
    /// `kind` may not be placed under `parent_kind` (`None` = root).
    IllegalParent {
        kind: ElementType,
        parent_kind: Option<ElementType>,
    },
    /// Reference points into another package.
    CrossPackage {
        element: ElementId,
        expected: PackageId,
        actual: PackageId,
    },
    /// Move would place a node inside its own subtree.
    CycleDetected {
        node: ElementId,
        parent: ElementId,
    },
    /// Dependency from a node to itself.
    SelfDependency(ElementId),
    /// The ordered pair is already linked (persisted or pending).
    DuplicateDependency {
        predecessor: ElementId,
        successor: ElementId,
    },
    /// Operation needs a stable remote id but the node is still a draft.
    DraftNotPersisted(ElementId),
    /// Draft confirmation already has a create call in flight.
    DraftConfirmInFlight(ElementId),
    /// Remote record cannot be narrowed into a typed element.
    InvalidRecord(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownElement(id) => write!(f, "task element not found: {id}"),
            Self::UnknownParent(id) => write!(f, "parent element not found: {id}"),
            Self::UnknownDraft(id) => write!(f, "draft not found: {id}"),
            Self::BlankName => write!(f, "name must not be blank"),
            Self::IllegalParent { kind, parent_kind } => match parent_kind {
                Some(parent_kind) => write!(f, "{kind} cannot be placed under {parent_kind}"),
                None => write!(f, "{kind} cannot be placed at root level"),
            },
            Self::CrossPackage {
                element,
                expected,
                actual,
            } => write!(
                f,
                "element {element} belongs to package {actual}, expected {expected}"
            ),
            Self::CycleDetected { node, parent } => {
                write!(f, "move would create cycle: node {node} under parent {parent}")
            }
            Self::SelfDependency(id) => write!(f, "task cannot depend on itself: {id}"),
            Self::DuplicateDependency {
                predecessor,
                successor,
            } => write!(f, "dependency already exists: {predecessor} -> {successor}"),
            Self::DraftNotPersisted(id) => write!(f, "draft is not saved yet: {id}"),
            Self::DraftConfirmInFlight(id) => write!(f, "draft is already being saved: {id}"),
            Self::InvalidRecord(message) => write!(f, "invalid task element record: {message}"),
        }
    }
}

impl Error for ValidationError {}
