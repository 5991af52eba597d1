//! Dependency edge model.
//!
//! # Invariants
//! - `predecessor_id != successor_id`.
//! - Two payloads describe the same edge when their derived keys match.

use crate::model::element::ElementId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Scheduling relation between two leaf tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FinishToStart => "FINISH_TO_START",
            Self::StartToStart => "START_TO_START",
            Self::FinishToFinish => "FINISH_TO_FINISH",
            Self::StartToFinish => "START_TO_FINISH",
        }
    }
}

impl Display for DependencyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge `predecessor -> successor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// Remote id; absent for pending edges and for some embedded payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub predecessor_id: ElementId,
    pub successor_id: ElementId,
    #[serde(rename = "type", default)]
    pub kind: DependencyType,
    #[serde(default)]
    pub lag_days: i32,
}

impl DependencyEdge {
    pub fn new(
        predecessor_id: ElementId,
        successor_id: ElementId,
        kind: DependencyType,
        lag_days: i32,
    ) -> Self {
        Self {
            id: None,
            predecessor_id,
            successor_id,
            kind,
            lag_days,
        }
    }

    /// Dedup key: the remote id when present, else `pred->succ:type`.
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.pair_key(),
        }
    }

    /// Id-independent key used to coalesce the same edge seen with and
    /// without its remote id.
    pub fn pair_key(&self) -> String {
        format!(
            "{}->{}:{}",
            self.predecessor_id, self.successor_id, self.kind
        )
    }

    pub fn is_self_loop(&self) -> bool {
        self.predecessor_id == self.successor_id
    }

    /// Returns whether this edge links `predecessor` to `successor`.
    pub fn links(&self, predecessor: &ElementId, successor: &ElementId) -> bool {
        &self.predecessor_id == predecessor && &self.successor_id == successor
    }
}
