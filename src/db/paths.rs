//! Path backfill and integrity checks.

use super::Database;
use super::tasks::{load_task_set, persist_changes};
use crate::subscriptions::MutationKind;
use crate::tree::check::{IntegrityIssue, check_integrity};
use crate::tree::{TaskSet, path};
use crate::types::TaskId;
use anyhow::Result;
use tracing::{debug, info, warn};

impl Database {
    /// Fill path and depth for tasks that have none. Safe to run on every
    /// startup; returns the number of tasks written.
    pub fn fill_path_depth(&self) -> Result<usize> {
        let written = self.rewrite_paths(|set| path::fill_path_depth(set).map(|_| ()))?;
        if written.is_empty() {
            debug!("All paths populated");
        } else {
            info!(filled = written.len(), "Backfilled task paths");
            self.publish(MutationKind::BoardReplaced, written.clone());
        }
        Ok(written.len())
    }

    /// Recompute path and depth for every task from the parent links, and
    /// close any gaps in sibling order. Returns the number of tasks written.
    pub fn reindex_all(&self) -> Result<usize> {
        let written = self.rewrite_paths(|set| {
            path::reindex_all(set)?;
            let scopes = set.scopes();
            set.normalize_scopes(scopes);
            Ok(())
        })?;
        info!(written = written.len(), "Reindexed board");
        if !written.is_empty() {
            self.publish(MutationKind::BoardReplaced, written.clone());
        }
        Ok(written.len())
    }

    fn rewrite_paths<F>(&self, f: F) -> Result<Vec<TaskId>>
    where
        F: FnOnce(&mut TaskSet) -> Result<(), crate::error::BoardError>,
    {
        self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let before = set.clone();
            f(&mut set)?;
            persist_changes(tx, &mut set, &before)
        })
    }

    /// Report every violated structural invariant. Read-only.
    pub fn check_integrity(&self) -> Result<Vec<IntegrityIssue>> {
        let issues = check_integrity(&self.task_set()?);
        if !issues.is_empty() {
            warn!(issues = issues.len(), "Integrity check found problems");
        }
        Ok(issues)
    }
}
