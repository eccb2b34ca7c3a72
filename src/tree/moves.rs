//! Multi-select tree moves.
//!
//! A move relocates a selection to `{new_status, new_parent_id}` at an
//! insertion index. Only move roots (selected tasks whose parent is not also
//! selected) are reparented; every selected task's subtree travels with it.
//! Sibling order is renumbered in the vacated scopes and the destination scope
//! so that each stays `0..N-1`.

use super::{TaskSet, path};
use crate::error::BoardError;
use crate::types::{MoveOutcome, MoveRequest, NoOpReason, Scope, TaskId};
use std::collections::{BTreeSet, HashSet};

/// Apply `request` to `set` in place.
///
/// Returns `NoOp` without touching `set` when the selection is empty or
/// stale, the destination parent is missing, or the destination lies inside
/// the moved subtrees. Errors only on integrity violations found while
/// reindexing paths, in which case `set` must be discarded.
pub fn apply_move(set: &mut TaskSet, request: &MoveRequest) -> Result<MoveOutcome, BoardError> {
    if request.task_ids.is_empty() {
        return Ok(MoveOutcome::NoOp {
            reason: NoOpReason::EmptySelection,
        });
    }

    let mut seen = HashSet::new();
    let selected: Vec<TaskId> = request
        .task_ids
        .iter()
        .copied()
        .filter(|&id| set.contains(id) && seen.insert(id))
        .collect();
    if selected.is_empty() {
        return Ok(MoveOutcome::NoOp {
            reason: NoOpReason::StaleIds,
        });
    }

    if request.new_parent_id.is_some_and(|parent_id| !set.contains(parent_id)) {
        return Ok(MoveOutcome::NoOp {
            reason: NoOpReason::MissingParent,
        });
    }

    let affected = set.children_index().closure(&selected);
    if request
        .new_parent_id
        .is_some_and(|parent_id| affected.contains(&parent_id))
    {
        return Ok(MoveOutcome::NoOp {
            reason: NoOpReason::Cycle,
        });
    }

    let roots = move_roots(set, &selected);
    let destination = request.destination();
    let source_scopes: BTreeSet<Scope> = roots
        .iter()
        .filter_map(|&id| set.get(id).map(|t| t.scope()))
        .collect();

    if source_scopes.len() == 1 && source_scopes.contains(&destination) {
        reorder_within_scope(set, destination, &roots, request.insertion_index);
    } else {
        relocate(set, request, &roots, &affected, &source_scopes);
    }

    for &root in &roots {
        path::recompute_path(set, root)?;
    }

    Ok(MoveOutcome::Applied {
        roots,
        affected: affected.len(),
    })
}

/// Selected tasks whose parent is absent or unselected, ordered by current
/// `sort_order`. Ties keep selection order.
fn move_roots(set: &TaskSet, selected: &[TaskId]) -> Vec<TaskId> {
    let selected_ids: HashSet<TaskId> = selected.iter().copied().collect();
    let mut roots: Vec<TaskId> = selected
        .iter()
        .copied()
        .filter(|&id| match set.get(id).and_then(|t| t.parent_id) {
            Some(parent_id) => !selected_ids.contains(&parent_id),
            None => true,
        })
        .collect();
    roots.sort_by_key(|&id| set.get(id).map(|t| t.sort_order).unwrap_or(i64::MAX));
    roots
}

fn clamp_index(index: i64, len: usize) -> usize {
    index.clamp(0, len as i64) as usize
}

/// Pure reorder: the roots already live in the destination scope.
fn reorder_within_scope(set: &mut TaskSet, scope: Scope, roots: &[TaskId], index: i64) {
    let root_ids: HashSet<TaskId> = roots.iter().copied().collect();
    let mut siblings: Vec<TaskId> = set
        .scope_members(scope)
        .into_iter()
        .filter(|id| !root_ids.contains(id))
        .collect();
    let at = clamp_index(index, siblings.len());
    siblings.splice(at..at, roots.iter().copied());
    set.renumber(&siblings);
}

fn relocate(
    set: &mut TaskSet,
    request: &MoveRequest,
    roots: &[TaskId],
    affected: &HashSet<TaskId>,
    source_scopes: &BTreeSet<Scope>,
) {
    let destination = request.destination();
    let root_ids: HashSet<TaskId> = roots.iter().copied().collect();

    // Compute every list against the pre-move structure. A vacated scope can
    // hold unselected siblings of a nested root; they stay put unless their
    // status changes with the enclosing subtree.
    let leaves_scope = |id: TaskId| {
        root_ids.contains(&id)
            || (affected.contains(&id)
                && set.get(id).is_some_and(|t| t.status != request.new_status))
    };
    let vacated: Vec<Vec<TaskId>> = source_scopes
        .iter()
        .filter(|&&scope| scope != destination)
        .map(|&scope| {
            set.scope_members(scope)
                .into_iter()
                .filter(|&id| !leaves_scope(id))
                .collect()
        })
        .collect();
    let mut landing: Vec<TaskId> = set
        .scope_members(destination)
        .into_iter()
        .filter(|id| !affected.contains(id))
        .collect();
    let at = clamp_index(request.insertion_index, landing.len());
    landing.splice(at..at, roots.iter().copied());

    // Status follows the subtree; only roots change parent.
    let mut internal_scopes = BTreeSet::new();
    for &id in affected {
        if let Some(task) = set.get_mut(id) {
            if task.status == request.new_status {
                continue;
            }
            if !root_ids.contains(&id) {
                internal_scopes.insert(Scope::new(task.parent_id, request.new_status));
            }
            task.status = request.new_status;
        }
    }
    for &id in roots {
        if let Some(task) = set.get_mut(id) {
            task.parent_id = request.new_parent_id;
        }
    }

    for siblings in &vacated {
        set.renumber(siblings);
    }
    set.renumber(&landing);

    // Children that switched status may have merged into a sibling scope
    // inside the moved subtree.
    set.normalize_scopes(internal_scopes);
}
