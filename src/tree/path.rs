//! Materialized path and depth indexing.
//!
//! A task's path is the `/`-joined, zero-padded ids of its ancestor chain
//! including itself (`000004/000102`), so "is X under Y" becomes a string
//! prefix test. Depth is the number of ancestors.

use super::{ChildIndex, TaskSet};
use crate::error::BoardError;
use crate::types::TaskId;
use std::collections::HashSet;

/// Digits per path segment. Fixed for the lifetime of a database: changing it
/// invalidates every stored path.
pub const PATH_SEGMENT_WIDTH: usize = 6;

/// Largest id that fits in one path segment.
pub const MAX_PATH_ID: TaskId = 999_999;

pub const PATH_SEPARATOR: char = '/';

/// Zero-pad an id to [`PATH_SEGMENT_WIDTH`] digits.
pub fn pad_id(id: TaskId) -> Result<String, BoardError> {
    if !(0..=MAX_PATH_ID).contains(&id) {
        return Err(BoardError::IdOverflow {
            id,
            width: PATH_SEGMENT_WIDTH,
        });
    }
    Ok(format!("{:0width$}", id, width = PATH_SEGMENT_WIDTH))
}

/// Path of a child with the given id under `parent_path`.
pub fn child_path(parent_path: &str, id: TaskId) -> Result<String, BoardError> {
    Ok(format!("{}{}{}", parent_path, PATH_SEPARATOR, pad_id(id)?))
}

/// True when `candidate` lies strictly below `ancestor`.
pub fn is_path_descendant(candidate: &str, ancestor: &str) -> bool {
    !ancestor.is_empty()
        && candidate.len() > ancestor.len() + 1
        && candidate.starts_with(ancestor)
        && candidate[ancestor.len()..].starts_with(PATH_SEPARATOR)
}

/// Ids of every task whose path lies below `ancestor_path`.
pub fn descendants_by_path(set: &TaskSet, ancestor_path: &str) -> Vec<TaskId> {
    set.iter()
        .filter(|t| is_path_descendant(&t.path, ancestor_path))
        .map(|t| t.id)
        .collect()
}

/// Recompute path and depth for `root` and all of its descendants.
///
/// `root.parent_id` must already be final and the parent's own path correct.
/// Returns the number of tasks indexed.
pub fn recompute_path(set: &mut TaskSet, root: TaskId) -> Result<usize, BoardError> {
    let index = set.children_index();
    recompute_with_index(set, &index, root)
}

fn recompute_with_index(
    set: &mut TaskSet,
    index: &ChildIndex,
    root: TaskId,
) -> Result<usize, BoardError> {
    let order = index.subtree(root);
    for &id in &order {
        let task = set.get(id).ok_or(BoardError::TaskNotFound(id))?;
        let (path, depth) = match task.parent_id {
            None => (pad_id(id)?, 0),
            Some(parent_id) => {
                let parent = set.get(parent_id).ok_or(BoardError::DanglingParent {
                    task_id: id,
                    parent_id,
                })?;
                (child_path(&parent.path, id)?, parent.depth + 1)
            }
        };
        if let Some(task) = set.get_mut(id) {
            task.path = path;
            task.depth = depth;
        }
    }
    Ok(order.len())
}

/// Recompute every task's path from the roots down, ignoring stored values.
pub fn reindex_all(set: &mut TaskSet) -> Result<usize, BoardError> {
    let index = set.children_index();
    let mut indexed = 0;
    for &root in index.children(None) {
        indexed += recompute_with_index(set, &index, root)?;
    }
    if indexed < set.len() {
        return Err(unreachable_error(set, &index));
    }
    Ok(indexed)
}

/// Fill path and depth for every task whose path is empty.
///
/// No-op once every path is populated, so it is safe on every startup.
/// Parents are processed before children regardless of id order.
pub fn fill_path_depth(set: &mut TaskSet) -> Result<usize, BoardError> {
    if set.iter().all(|t| !t.path.is_empty()) {
        return Ok(0);
    }

    let index = set.children_index();
    let mut reached = 0;
    let mut filled = 0;
    for &root in index.children(None) {
        for id in index.subtree(root) {
            reached += 1;
            let Some(task) = set.get(id) else { continue };
            if !task.path.is_empty() {
                continue;
            }
            let (path, depth) = match task.parent_id {
                None => (pad_id(id)?, 0),
                Some(parent_id) => {
                    let parent = set.get(parent_id).ok_or(BoardError::DanglingParent {
                        task_id: id,
                        parent_id,
                    })?;
                    (child_path(&parent.path, id)?, parent.depth + 1)
                }
            };
            if let Some(task) = set.get_mut(id) {
                task.path = path;
                task.depth = depth;
                filled += 1;
            }
        }
    }
    if reached < set.len() {
        return Err(unreachable_error(set, &index));
    }
    Ok(filled)
}

/// Explain why some task cannot be reached from a root.
fn unreachable_error(set: &TaskSet, index: &ChildIndex) -> BoardError {
    let reachable: HashSet<TaskId> = index
        .children(None)
        .iter()
        .flat_map(|&root| index.subtree(root))
        .collect();
    for task in set.iter().filter(|t| !reachable.contains(&t.id)) {
        match task.parent_id {
            Some(parent_id) if !set.contains(parent_id) => {
                return BoardError::DanglingParent {
                    task_id: task.id,
                    parent_id,
                };
            }
            _ => {}
        }
    }
    match set.iter().find(|t| !reachable.contains(&t.id)) {
        Some(task) => BoardError::Cycle(task.id),
        None => BoardError::internal("path index lost track of a task"),
    }
}
