//! Completion and visibility cascades.

use super::{ChildIndex, TaskSet, path};
use crate::types::{CompletionChange, Scope, TaskId, TaskStatus};
use std::collections::{BTreeSet, HashSet};

/// Status a task returns to when un-completed without a remembered status.
pub const DEFAULT_RESTORE_STATUS: TaskStatus = TaskStatus::NextActions;

/// Flip completion on `id`, cascading down to every descendant and, when
/// completing, up through ancestors whose children are now all complete.
///
/// Returns `None` if the task does not exist. Scopes whose membership changed
/// because of a status switch are renumbered to stay contiguous.
pub fn toggle_completion(set: &mut TaskSet, id: TaskId) -> Option<CompletionChange> {
    let completed = !set.get(id)?.is_completed;
    let index = set.children_index();

    let mut cascade = Cascade::default();
    cascade.mark_subtree(set, &index, id, completed);

    if completed {
        let mut current = set.get(id).and_then(|t| t.parent_id);
        let mut steps = 0;
        while let Some(parent_id) = current {
            steps += 1;
            let Some(parent) = set.get(parent_id) else { break };
            if parent.is_completed || steps > set.len() {
                break;
            }
            let all_done = index
                .children(Some(parent_id))
                .iter()
                .all(|&child| set.get(child).is_some_and(|t| t.is_completed));
            if !all_done {
                break;
            }
            cascade.mark_subtree(set, &index, parent_id, true);
            current = set.get(parent_id).and_then(|t| t.parent_id);
        }
    }

    set.normalize_scopes(cascade.scopes);
    Some(CompletionChange {
        completed,
        cascaded: cascade.changed,
    })
}

#[derive(Default)]
struct Cascade {
    visited: HashSet<TaskId>,
    changed: Vec<TaskId>,
    scopes: BTreeSet<Scope>,
}

impl Cascade {
    fn mark_subtree(&mut self, set: &mut TaskSet, index: &ChildIndex, root: TaskId, completed: bool) {
        for id in index.subtree(root) {
            if !self.visited.insert(id) {
                continue;
            }
            let Some(task) = set.get_mut(id) else { continue };
            let old_scope = task.scope();
            let before = (task.is_completed, task.status, task.original_status);

            task.is_completed = completed;
            if completed {
                if task.status != TaskStatus::Completed {
                    task.original_status = Some(task.status);
                }
                task.status = TaskStatus::Completed;
            } else {
                task.status = task.original_status.take().unwrap_or(DEFAULT_RESTORE_STATUS);
            }

            if task.scope() != old_scope {
                self.scopes.insert(old_scope);
                self.scopes.insert(task.scope());
            }
            if (task.is_completed, task.status, task.original_status) != before {
                self.changed.push(id);
            }
        }
    }
}

/// Set `is_hidden` on `id` and force the same value onto its descendants.
///
/// Returns the ids whose flag actually changed, or `None` if the task does
/// not exist.
pub fn set_hidden(set: &mut TaskSet, id: TaskId, hidden: bool) -> Option<Vec<TaskId>> {
    let task = set.get_mut(id)?;
    let mut changed = Vec::new();
    if task.is_hidden != hidden {
        task.is_hidden = hidden;
        changed.push(id);
    }
    changed.extend(cascade_hidden(set, id, hidden));
    Some(changed)
}

/// Propagate `hidden` to every descendant of `id`, found by path prefix.
///
/// Returns the descendants whose stored flag changed; empty when the task is
/// missing or has no path yet.
pub fn cascade_hidden(set: &mut TaskSet, id: TaskId, hidden: bool) -> Vec<TaskId> {
    let Some(ancestor_path) = set.get(id).map(|t| t.path.clone()) else {
        return Vec::new();
    };
    if ancestor_path.is_empty() {
        return Vec::new();
    }

    let targets: Vec<TaskId> = path::descendants_by_path(set, &ancestor_path)
        .into_iter()
        .filter(|&d| set.get(d).is_some_and(|t| t.is_hidden != hidden))
        .collect();
    for &d in &targets {
        if let Some(task) = set.get_mut(d) {
            task.is_hidden = hidden;
        }
    }
    targets
}
