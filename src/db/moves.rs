//! Transactional tree moves.

use super::Database;
use super::tasks::{load_task_set, persist_changes};
use crate::subscriptions::MutationKind;
use crate::tree::moves::apply_move;
use crate::types::{MoveOutcome, MoveRequest, TaskId, TaskStatus};
use anyhow::Result;
use tracing::{debug, info};

impl Database {
    /// Move a selection of tasks (with their subtrees) to a new status and
    /// parent at the given sibling position.
    ///
    /// Either every affected record is written or none is. Rejected requests
    /// come back as [`MoveOutcome::NoOp`] and leave the store untouched.
    pub fn move_tasks(&self, request: &MoveRequest) -> Result<MoveOutcome> {
        let (outcome, changed) = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let before = set.clone();

            let outcome = apply_move(&mut set, request)?;
            let changed = match outcome {
                MoveOutcome::Applied { .. } => persist_changes(tx, &mut set, &before)?,
                MoveOutcome::NoOp { .. } => Vec::new(),
            };
            Ok((outcome, changed))
        })?;

        match &outcome {
            MoveOutcome::Applied { roots, affected } => {
                info!(
                    ?roots,
                    affected,
                    written = changed.len(),
                    status = %request.new_status,
                    parent_id = ?request.new_parent_id,
                    index = request.insertion_index,
                    "Moved tasks"
                );
                if !changed.is_empty() {
                    self.publish(MutationKind::TasksMoved, changed);
                }
            }
            MoveOutcome::NoOp { reason } => {
                debug!(
                    task_ids = ?request.task_ids,
                    reason = reason.as_str(),
                    "Move rejected"
                );
            }
        }
        Ok(outcome)
    }

    /// Move a single task; shorthand for a one-element selection.
    pub fn move_task(
        &self,
        task_id: TaskId,
        new_status: TaskStatus,
        new_parent_id: Option<TaskId>,
        insertion_index: i64,
    ) -> Result<MoveOutcome> {
        self.move_tasks(&MoveRequest::new(
            vec![task_id],
            new_status,
            new_parent_id,
            insertion_index,
        ))
    }
}
