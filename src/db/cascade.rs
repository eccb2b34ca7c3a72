//! Completion and visibility cascades, persisted.

use super::Database;
use super::tasks::{load_task_set, persist_changes};
use crate::error::BoardError;
use crate::subscriptions::MutationKind;
use crate::tree::cascade;
use crate::types::{CompletionChange, TaskId};
use anyhow::Result;
use tracing::{debug, info};

impl Database {
    /// Flip a task's completion, cascading to its subtree and, when
    /// completing, to ancestors whose children are now all complete.
    pub fn toggle_completion(&self, task_id: TaskId) -> Result<CompletionChange> {
        let (change, written) = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let before = set.clone();

            let change = cascade::toggle_completion(&mut set, task_id)
                .ok_or(BoardError::TaskNotFound(task_id))?;
            let written = persist_changes(tx, &mut set, &before)?;
            Ok((change, written))
        })?;

        info!(
            task_id,
            completed = change.completed,
            cascaded = change.cascaded.len(),
            written = written.len(),
            "Toggled completion"
        );
        self.publish(MutationKind::CompletionChanged, written);
        Ok(change)
    }

    /// Set the hidden flag on a task and force it onto every descendant.
    /// Returns the ids whose flag changed.
    pub fn set_hidden(&self, task_id: TaskId, hidden: bool) -> Result<Vec<TaskId>> {
        let changed = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let before = set.clone();

            cascade::set_hidden(&mut set, task_id, hidden).ok_or(BoardError::TaskNotFound(task_id))?;
            persist_changes(tx, &mut set, &before)
        })?;

        if changed.is_empty() {
            debug!(task_id, hidden, "Hidden flag already set");
        } else {
            info!(task_id, hidden, changed = changed.len(), "Set hidden");
            self.publish(MutationKind::VisibilityChanged, changed.clone());
        }
        Ok(changed)
    }
}
