//! Structural integrity checks.

use super::{TaskSet, path};
use crate::types::{Scope, TaskId};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A single violated invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    DanglingParent { task_id: TaskId, parent_id: TaskId },
    Cycle { task_id: TaskId },
    PathMismatch { task_id: TaskId, expected: String, actual: String },
    DepthMismatch { task_id: TaskId, expected: i64, actual: i64 },
    NonContiguousScope { scope: Scope, orders: Vec<i64> },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::DanglingParent { task_id, parent_id } => {
                write!(f, "task {} references missing parent {}", task_id, parent_id)
            }
            IntegrityIssue::Cycle { task_id } => write!(f, "task {} is its own ancestor", task_id),
            IntegrityIssue::PathMismatch {
                task_id,
                expected,
                actual,
            } => write!(
                f,
                "task {} has path '{}', expected '{}'",
                task_id, actual, expected
            ),
            IntegrityIssue::DepthMismatch {
                task_id,
                expected,
                actual,
            } => write!(f, "task {} has depth {}, expected {}", task_id, actual, expected),
            IntegrityIssue::NonContiguousScope { scope, orders } => write!(
                f,
                "scope (parent {:?}, {}) has sort orders {:?}",
                scope.parent_id, scope.status, orders
            ),
        }
    }
}

/// Check every structural invariant of the set.
pub fn check_integrity(set: &TaskSet) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();

    for task in set.iter() {
        match expected_path(set, task.id) {
            Ok((expected, depth)) => {
                if task.path != expected {
                    issues.push(IntegrityIssue::PathMismatch {
                        task_id: task.id,
                        expected,
                        actual: task.path.clone(),
                    });
                }
                if task.depth != depth {
                    issues.push(IntegrityIssue::DepthMismatch {
                        task_id: task.id,
                        expected: depth,
                        actual: task.depth,
                    });
                }
            }
            Err(issue) => issues.push(issue),
        }
    }

    for scope in set.scopes() {
        let orders: Vec<i64> = set
            .scope_members(scope)
            .iter()
            .filter_map(|&id| set.get(id).map(|t| t.sort_order))
            .collect();
        if orders.iter().copied().ne(0..orders.len() as i64) {
            issues.push(IntegrityIssue::NonContiguousScope { scope, orders });
        }
    }

    issues
}

/// Path and depth implied by the live parent chain of `id`.
fn expected_path(set: &TaskSet, id: TaskId) -> Result<(String, i64), IntegrityIssue> {
    let mut chain = vec![id];
    let mut seen = HashSet::from([id]);
    let mut current = set.get(id).and_then(|t| t.parent_id);
    while let Some(parent_id) = current {
        let Some(parent) = set.get(parent_id) else {
            let task_id = *chain.last().unwrap_or(&id);
            return Err(IntegrityIssue::DanglingParent { task_id, parent_id });
        };
        if !seen.insert(parent_id) {
            return Err(IntegrityIssue::Cycle { task_id: id });
        }
        chain.push(parent_id);
        current = parent.parent_id;
    }

    let mut segments = Vec::with_capacity(chain.len());
    for &segment in chain.iter().rev() {
        segments.push(path::pad_id(segment).unwrap_or_else(|_| segment.to_string()));
    }
    Ok((
        segments.join(&path::PATH_SEPARATOR.to_string()),
        chain.len() as i64 - 1,
    ))
}
