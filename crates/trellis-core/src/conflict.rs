//! Conflict detection.
//!
//! The detector only reports. It never blocks or rejects a proposal; the
//! caller decides what to do with a populated report.

use crate::operation::{ActionType, Operation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The operation being checked. It does not have to exist in the graph.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub action_type: &'a ActionType,
    pub files: &'a BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEntry {
    pub operation_id: String,
    pub agent_id: String,
    pub action_type: ActionType,
    pub overlapping_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub conflicts: Vec<ConflictEntry>,
}

impl ConflictReport {
    pub fn new(conflicts: Vec<ConflictEntry>) -> Self {
        Self {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
        }
    }

    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.conflicts.iter().map(|c| c.operation_id.as_str())
    }

    pub fn contains(&self, operation_id: &str) -> bool {
        self.operation_ids().any(|id| id == operation_id)
    }
}

/// Files two operations would collide on, sorted. Empty means no conflict.
pub fn overlap(
    a_action: &ActionType,
    a_files: &BTreeSet<String>,
    b_action: &ActionType,
    b_files: &BTreeSet<String>,
) -> Vec<String> {
    if !a_action.is_mutating() && !b_action.is_mutating() {
        return Vec::new();
    }
    a_files.intersection(b_files).cloned().collect()
}

/// Compare `candidate` against every in-flight operation, from any agent.
///
/// `in_flight` is expected in insertion order; the report keeps that order.
pub fn check_conflicts<'a>(
    candidate: Candidate<'_>,
    in_flight: impl IntoIterator<Item = &'a Operation>,
) -> ConflictReport {
    if candidate.files.is_empty() {
        return ConflictReport::default();
    }
    let conflicts = in_flight
        .into_iter()
        .filter_map(|op| {
            let files = overlap(
                candidate.action_type,
                candidate.files,
                &op.action_type,
                &op.files,
            );
            (!files.is_empty()).then(|| ConflictEntry {
                operation_id: op.id.clone(),
                agent_id: op.agent_id.clone(),
                action_type: op.action_type.clone(),
                overlapping_files: files,
            })
        })
        .collect();
    ConflictReport::new(conflicts)
}
