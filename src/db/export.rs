//! Snapshot import/export and subtree capture/restore.
//!
//! A snapshot is `{ "tasks": [...] }` with camelCase fields. Imported data
//! is untrusted: stored paths, depths and sort orders are recomputed from the
//! parent links before commit.

use super::Database;
use super::tasks::{delete_rows, insert_task_row, load_task_set, persist_changes};
use crate::error::BoardError;
use crate::subscriptions::MutationKind;
use crate::tree::{TaskSet, path};
use crate::types::{Scope, Task, TaskId};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Serialized form of the whole board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Database {
    /// Every task, ordered by id.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            tasks: self.list_tasks()?,
        })
    }

    /// Pretty-printed JSON snapshot of the board.
    pub fn export_json(&self) -> Result<String> {
        let snapshot = self.export_snapshot()?;
        info!(tasks = snapshot.tasks.len(), "Exported board");
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Replace the whole board with the tasks in `json`.
    ///
    /// An empty snapshot leaves the board untouched. Returns the number of
    /// tasks imported.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        self.import_snapshot(snapshot)
    }

    pub fn import_snapshot(&self, snapshot: Snapshot) -> Result<usize> {
        if snapshot.tasks.is_empty() {
            debug!("Empty import ignored");
            return Ok(0);
        }

        let count = snapshot.tasks.len();
        let ids = self.with_transaction(|tx| {
            let imported = TaskSet::new(snapshot.tasks);
            if imported.len() != count {
                return Err(BoardError::invalid_value("tasks", "duplicate task id in import").into());
            }

            tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
            tx.execute("DELETE FROM tasks", [])?;
            for task in imported.iter() {
                insert_task_row(tx, task)?;
            }

            let mut set = imported.clone();
            path::reindex_all(&mut set)?;
            let scopes = set.scopes();
            set.normalize_scopes(scopes);
            persist_changes(tx, &mut set, &imported)?;

            Ok(set.iter().map(|t| t.id).collect::<Vec<TaskId>>())
        })?;

        info!(imported = ids.len(), "Imported board");
        self.publish(MutationKind::BoardReplaced, ids);
        Ok(count)
    }

    /// Deep copies of the given roots and all of their descendants, each task
    /// once, roots in the order given.
    pub fn capture_subtrees(&self, root_ids: &[TaskId]) -> Result<Vec<Task>> {
        let set = self.task_set()?;
        let index = set.children_index();
        let mut seen = HashSet::new();
        let mut captured = Vec::new();
        for &root in root_ids.iter().filter(|&&id| set.contains(id)) {
            for id in index.subtree(root) {
                if seen.insert(id) {
                    captured.extend(set.get(id).cloned());
                }
            }
        }
        debug!(roots = root_ids.len(), captured = captured.len(), "Captured subtrees");
        Ok(captured)
    }

    /// Put previously captured tasks back, replacing any rows with the same
    /// ids, then recompute paths for the whole board.
    ///
    /// Fails with `DanglingParent` (and changes nothing) if a restored root's
    /// parent no longer exists.
    pub fn restore_tasks(&self, tasks: &[Task]) -> Result<usize> {
        if tasks.is_empty() {
            return Ok(0);
        }

        let restored: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        self.with_transaction(|tx| {
            tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
            delete_rows(tx, &restored)?;
            for task in tasks {
                insert_task_row(tx, task)?;
            }

            let mut set = load_task_set(tx)?;
            let before = set.clone();
            path::reindex_all(&mut set)?;
            let scopes: BTreeSet<Scope> = tasks
                .iter()
                .filter_map(|t| set.get(t.id))
                .map(Task::scope)
                .collect();
            set.normalize_scopes(scopes);
            persist_changes(tx, &mut set, &before)?;
            Ok(())
        })?;

        info!(restored = restored.len(), "Restored tasks");
        self.publish(MutationKind::TaskCreated, restored.clone());
        Ok(restored.len())
    }
}
