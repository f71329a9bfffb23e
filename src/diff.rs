//! State differ
//!
//! Computes the delta between a desired and a current `SystemState`
//! snapshot as an unordered `ChangeSet`. Ordering is the planner's job.

use crate::error::NetstateResult;
use crate::state::{AdminState, InterfaceState, SystemState};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Kind of change to apply to one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Modify,
    Delete,
    Activate,
    Deactivate,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Create => "create",
            OperationKind::Modify => "modify",
            OperationKind::Delete => "delete",
            OperationKind::Activate => "activate",
            OperationKind::Deactivate => "deactivate",
        };
        write!(f, "{}", s)
    }
}

/// A single planned change against one interface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    /// Target interface state. For deletion-direction operations this is the
    /// current state of the interface being torn down.
    pub iface: InterfaceState,
}

impl Operation {
    pub fn new(kind: OperationKind, iface: InterfaceState) -> Self {
        Self { kind, iface }
    }

    /// Short identity used in logs and apply failures
    pub fn describe(&self) -> String {
        format!("{} {}", self.kind, self.iface.name)
    }

    /// Whether this operation builds up (create/modify/activate) rather
    /// than tears down (deactivate/delete)
    pub fn is_creation_direction(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::Create | OperationKind::Modify | OperationKind::Activate
        )
    }
}

/// Ordered sequence of operations
///
/// Produced unordered by [`diff`], ordered by the planner, consumed once by
/// the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    pub ops: Vec<Operation>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }
}

/// One field that differs between desired and actual state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub field: String,
    pub desired: serde_json::Value,
    pub actual: serde_json::Value,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: desired {} != actual {}", self.field, self.desired, self.actual)
    }
}

/// Field-level structural diff of two config subtrees
///
/// Keys missing on one side diff against `null`. Shared by the differ (to
/// decide whether a modify is needed) and the verifier (to report exactly
/// which fields never converged).
pub fn config_diff(
    desired: &HashMap<String, serde_json::Value>,
    actual: &HashMap<String, serde_json::Value>,
) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();
    let mut fields: Vec<&String> = desired.keys().collect();
    for key in actual.keys() {
        if !desired.contains_key(key) {
            fields.push(key);
        }
    }
    fields.sort();
    for field in fields {
        let want = desired.get(field).cloned().unwrap_or(serde_json::Value::Null);
        let got = actual.get(field).cloned().unwrap_or(serde_json::Value::Null);
        if want != got {
            diffs.push(FieldDiff {
                field: field.clone(),
                desired: want,
                actual: got,
            });
        }
    }
    diffs
}

/// Compute the unordered change-set turning `current` into `desired`
///
/// Both snapshots are validated first; a dangling base-iface reference in
/// the desired state is an input error, reported before any diffing.
pub fn diff(desired: &SystemState, current: &SystemState) -> NetstateResult<ChangeSet> {
    current.validate_names()?;
    desired.validate_against(Some(current))?;

    let mut changeset = ChangeSet::default();

    for want in &desired.interfaces {
        match current.get(&want.name) {
            None => {
                if want.admin_state != AdminState::Absent {
                    changeset.push(Operation::new(OperationKind::Create, want.clone()));
                }
                // Desired absent and not on the system: nothing to do
            }
            Some(have) => {
                if want.admin_state == AdminState::Absent {
                    changeset.push(Operation::new(OperationKind::Deactivate, have.clone()));
                    changeset.push(Operation::new(OperationKind::Delete, have.clone()));
                    continue;
                }
                if !config_diff(&want.config, &have.config).is_empty() {
                    changeset.push(Operation::new(OperationKind::Modify, want.clone()));
                    continue;
                }
                match (want.admin_state, have.admin_state) {
                    (AdminState::Up, AdminState::Down) => {
                        changeset.push(Operation::new(OperationKind::Activate, want.clone()));
                    }
                    (AdminState::Down, AdminState::Up) => {
                        changeset.push(Operation::new(OperationKind::Deactivate, want.clone()));
                    }
                    // Field-equal: no change emitted
                    _ => {}
                }
            }
        }
    }

    // Interfaces this tool created that the desired state no longer mentions
    for have in &current.interfaces {
        if have.owned && !desired.contains(&have.name) {
            changeset.push(Operation::new(OperationKind::Deactivate, have.clone()));
            changeset.push(Operation::new(OperationKind::Delete, have.clone()));
        }
    }

    debug!(
        "diff: {} desired, {} current -> {} operation(s)",
        desired.interfaces.len(),
        current.interfaces.len(),
        changeset.len()
    );

    Ok(changeset)
}
