//! Task CRUD, bulk edits and contexts.

use super::{Database, now_ms};
use crate::error::BoardError;
use crate::subscriptions::MutationKind;
use crate::tree::{TaskSet, build_forest, cascade, filters, path};
use crate::types::{BulkUpdate, NewTask, Scope, Task, TaskId, TaskStatus, TaskTree, normalize_context};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;
use tracing::{debug, info};

const UPDATE_TASK_SQL: &str = "UPDATE tasks SET
        title = ?2, description = ?3, priority = ?4, status = ?5, parent_id = ?6,
        sort_order = ?7, is_completed = ?8, original_status = ?9, start_date = ?10,
        due_date = ?11, contexts = ?12, is_expanded = ?13, is_hidden = ?14,
        path = ?15, depth = ?16, updated_at = ?17
     WHERE id = ?1";

const INSERT_TASK_SQL: &str = "INSERT INTO tasks (
        id, title, description, priority, status, parent_id, sort_order,
        is_completed, original_status, start_date, due_date, contexts,
        is_expanded, is_hidden, path, depth, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)";

fn parse_column<T>(row: &Row, idx: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = BoardError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: BoardError| {
        let column = row.as_ref().column_index(idx).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
    })
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let original_status: Option<String> = row.get("original_status")?;
    let contexts_json: String = row.get("contexts")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority: parse_column(row, "priority")?,
        status: parse_column(row, "status")?,
        parent_id: row.get("parent_id")?,
        sort_order: row.get("sort_order")?,
        is_completed: row.get("is_completed")?,
        // Unknown remembered status falls back like a missing one.
        original_status: original_status.and_then(|s| s.parse().ok()),
        start_date: row.get("start_date")?,
        due_date: row.get("due_date")?,
        contexts: serde_json::from_str(&contexts_json).unwrap_or_default(),
        is_expanded: row.get("is_expanded")?,
        is_hidden: row.get("is_hidden")?,
        path: row.get("path")?,
        depth: row.get("depth")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Load every task into an in-memory working set.
pub(crate) fn load_task_set(conn: &Connection) -> Result<TaskSet> {
    let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY id")?;
    let tasks = stmt
        .query_map([], parse_task_row)?
        .collect::<rusqlite::Result<Vec<Task>>>()?;
    Ok(TaskSet::new(tasks))
}

fn get_task_internal(conn: &Connection, task_id: TaskId) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    match stmt.query_row(params![task_id], parse_task_row) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write every task in `set` that differs from `before`, stamping
/// `updated_at`. Returns the ids written.
pub(crate) fn persist_changes(
    conn: &Connection,
    set: &mut TaskSet,
    before: &TaskSet,
) -> Result<Vec<TaskId>> {
    let changed: Vec<TaskId> = set.changed_from(before).iter().map(|t| t.id).collect();
    if changed.is_empty() {
        return Ok(changed);
    }

    let now = now_ms();
    let mut stmt = conn.prepare_cached(UPDATE_TASK_SQL)?;
    for &id in &changed {
        let Some(task) = set.get_mut(id) else { continue };
        task.updated_at = now;
        let task = &*task;
        let contexts = serde_json::to_string(&task.contexts)?;
        stmt.execute(params![
            task.id,
            task.title,
            task.description,
            task.priority.as_str(),
            task.status.as_str(),
            task.parent_id,
            task.sort_order,
            task.is_completed,
            task.original_status.map(|s| s.as_str()),
            task.start_date,
            task.due_date,
            contexts,
            task.is_expanded,
            task.is_hidden,
            task.path,
            task.depth,
            task.updated_at,
        ])?;
    }
    Ok(changed)
}

/// Insert a task row verbatim, keeping its id.
pub(crate) fn insert_task_row(conn: &Connection, task: &Task) -> Result<()> {
    let contexts = serde_json::to_string(&task.contexts)?;
    conn.prepare_cached(INSERT_TASK_SQL)?.execute(params![
        task.id,
        task.title,
        task.description,
        task.priority.as_str(),
        task.status.as_str(),
        task.parent_id,
        task.sort_order,
        task.is_completed,
        task.original_status.map(|s| s.as_str()),
        task.start_date,
        task.due_date,
        contexts,
        task.is_expanded,
        task.is_hidden,
        task.path,
        task.depth,
        task.created_at,
        task.updated_at,
    ])?;
    Ok(())
}

/// Delete the given rows. Foreign keys must be deferred by the caller when a
/// parent and its children go in the same transaction.
pub(crate) fn delete_rows(conn: &Connection, ids: &[TaskId]) -> Result<usize> {
    let mut stmt = conn.prepare_cached("DELETE FROM tasks WHERE id = ?1")?;
    let mut deleted = 0;
    for id in ids {
        deleted += stmt.execute(params![id])?;
    }
    Ok(deleted)
}

/// Remove `roots` and everything below them from `set`, renumbering the
/// scopes they leave behind. Returns the removed ids.
fn remove_subtrees(set: &mut TaskSet, roots: &[TaskId]) -> Vec<TaskId> {
    let index = set.children_index();
    let mut doomed: HashSet<TaskId> = index.closure(roots);
    for &root in roots {
        if let Some(task) = set.get(root) {
            doomed.extend(path::descendants_by_path(set, &task.path));
        }
    }
    doomed.retain(|&id| set.contains(id));

    let vacated: BTreeSet<Scope> = doomed
        .iter()
        .filter_map(|&id| set.get(id))
        .filter(|t| t.parent_id.is_none_or(|p| !doomed.contains(&p)))
        .map(Task::scope)
        .collect();

    let mut removed: Vec<TaskId> = doomed.into_iter().collect();
    removed.sort_unstable();
    for &id in &removed {
        set.remove(id);
    }
    set.normalize_scopes(vacated);
    removed
}

impl Database {
    /// Snapshot of every task.
    pub fn task_set(&self) -> Result<TaskSet> {
        self.with_conn(load_task_set)
    }

    /// Create a task at the end of its `{parent, status}` scope.
    pub fn create_task(&self, input: NewTask) -> Result<Task> {
        let now = now_ms();
        let contexts: Vec<String> = dedup_contexts(&input.contexts);
        let contexts_json = serde_json::to_string(&contexts)?;

        let task = self.with_transaction(|tx| {
            let (parent_path, parent_depth) = match input.parent_id {
                Some(parent_id) => {
                    let parent = get_task_internal(tx, parent_id)?
                        .ok_or(BoardError::TaskNotFound(parent_id))?;
                    (Some(parent.path), parent.depth)
                }
                None => (None, -1),
            };

            let sort_order: i64 = tx.query_row(
                "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks
                 WHERE parent_id IS ?1 AND status = ?2",
                params![input.parent_id, input.status.as_str()],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO tasks (
                    title, description, priority, status, parent_id, sort_order,
                    start_date, due_date, contexts, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    input.title,
                    input.description,
                    input.priority.as_str(),
                    input.status.as_str(),
                    input.parent_id,
                    sort_order,
                    input.start_date,
                    input.due_date,
                    contexts_json,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();

            let task_path = match &parent_path {
                Some(parent_path) => path::child_path(parent_path, id)?,
                None => path::pad_id(id)?,
            };
            tx.execute(
                "UPDATE tasks SET path = ?1, depth = ?2 WHERE id = ?3",
                params![task_path, parent_depth + 1, id],
            )?;

            get_task_internal(tx, id)?.ok_or_else(|| BoardError::TaskNotFound(id).into())
        })?;

        info!(
            task_id = task.id,
            status = %task.status,
            parent_id = ?task.parent_id,
            sort_order = task.sort_order,
            "Created task"
        );
        self.publish(MutationKind::TaskCreated, vec![task.id]);
        Ok(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// All tasks ordered by id.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.task_set()?.into_vec())
    }

    /// The board as a forest, children rebuilt from parent links.
    pub fn get_tree(&self) -> Result<Vec<TaskTree>> {
        Ok(build_forest(&self.task_set()?))
    }

    /// Save the editable fields of `task`.
    ///
    /// Parent, status, sort order, path and depth are left alone; use
    /// [`Database::move_tasks`] for those. A change to `is_hidden` cascades to
    /// the subtree.
    pub fn update_task(&self, task: &Task) -> Result<Task> {
        let (updated, changed, hidden_changed) = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let before = set.clone();

            let current = set
                .get_mut(task.id)
                .ok_or(BoardError::TaskNotFound(task.id))?;
            let hidden_changed = current.is_hidden != task.is_hidden;
            current.title = task.title.clone();
            current.description = task.description.clone();
            current.priority = task.priority;
            current.start_date = task.start_date;
            current.due_date = task.due_date;
            current.contexts = dedup_contexts(&task.contexts);
            current.is_expanded = task.is_expanded;

            if hidden_changed {
                cascade::set_hidden(&mut set, task.id, task.is_hidden);
            }

            let changed = persist_changes(tx, &mut set, &before)?;
            let updated = set
                .get(task.id)
                .cloned()
                .ok_or(BoardError::TaskNotFound(task.id))?;
            Ok((updated, changed, hidden_changed))
        })?;

        if changed.is_empty() {
            debug!(task_id = task.id, "Update changed nothing");
            return Ok(updated);
        }
        info!(task_id = task.id, written = changed.len(), hidden_changed, "Updated task");
        let kind = if hidden_changed {
            MutationKind::VisibilityChanged
        } else {
            MutationKind::TaskUpdated
        };
        self.publish(kind, changed);
        Ok(updated)
    }

    /// Expand or collapse a task in tree views. Does not cascade.
    pub fn set_expanded(&self, task_id: TaskId, expanded: bool) -> Result<bool> {
        let now = now_ms();
        let updated = self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE tasks SET is_expanded = ?1, updated_at = ?2
                 WHERE id = ?3 AND is_expanded != ?1",
                params![expanded, now, task_id],
            )?;
            if rows == 0 && get_task_internal(conn, task_id)?.is_none() {
                return Err(BoardError::TaskNotFound(task_id).into());
            }
            Ok(rows > 0)
        })?;

        if updated {
            debug!(task_id, expanded, "Set expanded");
            self.publish(MutationKind::TaskUpdated, vec![task_id]);
        }
        Ok(updated)
    }

    /// Delete tasks and their subtrees. Unknown ids are ignored. Remaining
    /// siblings are renumbered. Returns every deleted id.
    pub fn delete_tasks(&self, task_ids: &[TaskId]) -> Result<Vec<TaskId>> {
        let deleted = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let roots: Vec<TaskId> = task_ids.iter().copied().filter(|&id| set.contains(id)).collect();
            delete_in_tx(tx, &mut set, &roots)
        })?;

        if deleted.is_empty() {
            debug!(?task_ids, "Nothing to delete");
        } else {
            info!(requested = task_ids.len(), deleted = deleted.len(), "Deleted tasks");
            self.publish(MutationKind::TasksDeleted, deleted.clone());
        }
        Ok(deleted)
    }

    /// Delete every task in the Completed column together with its subtree.
    pub fn delete_completed(&self) -> Result<Vec<TaskId>> {
        let deleted = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let roots: Vec<TaskId> = set
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .map(|t| t.id)
                .collect();
            delete_in_tx(tx, &mut set, &roots)
        })?;

        if !deleted.is_empty() {
            info!(deleted = deleted.len(), "Deleted completed tasks");
            self.publish(MutationKind::TasksDeleted, deleted.clone());
        }
        Ok(deleted)
    }

    /// Apply the same field edits to many tasks. Returns the ids changed.
    pub fn bulk_update(&self, update: &BulkUpdate) -> Result<Vec<TaskId>> {
        let add = update.context_to_add.as_deref().and_then(normalize_context);
        let remove = update.context_to_remove.as_deref().and_then(normalize_context);

        let changed = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let before = set.clone();

            for &id in &update.task_ids {
                let Some(task) = set.get_mut(id) else { continue };
                if let Some(due) = update.due_date {
                    task.due_date = Some(due);
                }
                if let Some(priority) = update.priority {
                    task.priority = priority;
                }
                if let Some(context) = &add {
                    if !task.contexts.contains(context) {
                        task.contexts.push(context.clone());
                    }
                }
                if let Some(context) = &remove {
                    task.contexts.retain(|c| c != context);
                }
            }

            persist_changes(tx, &mut set, &before)
        })?;

        if !changed.is_empty() {
            info!(requested = update.task_ids.len(), changed = changed.len(), "Bulk updated tasks");
            self.publish(MutationKind::TaskUpdated, changed.clone());
        }
        Ok(changed)
    }

    /// Every distinct context in use, sorted.
    pub fn all_contexts(&self) -> Result<Vec<String>> {
        Ok(filters::all_contexts(&self.task_set()?))
    }

    /// Open tasks tagged with `context` (with or without the leading `@`).
    pub fn tasks_by_context(&self, context: &str) -> Result<Vec<Task>> {
        Ok(filters::tasks_by_context(&self.task_set()?, context))
    }

    /// Remove `context` from every task. Returns the ids changed.
    pub fn delete_context(&self, context: &str) -> Result<Vec<TaskId>> {
        let Some(context) = normalize_context(context) else {
            return Ok(Vec::new());
        };

        let changed = self.with_transaction(|tx| {
            let mut set = load_task_set(tx)?;
            let before = set.clone();
            let tagged: Vec<TaskId> = set
                .iter()
                .filter(|t| t.contexts.contains(&context))
                .map(|t| t.id)
                .collect();
            for id in tagged {
                if let Some(task) = set.get_mut(id) {
                    task.contexts.retain(|c| *c != context);
                }
            }
            persist_changes(tx, &mut set, &before)
        })?;

        if !changed.is_empty() {
            info!(%context, changed = changed.len(), "Deleted context");
            self.publish(MutationKind::TaskUpdated, changed.clone());
        }
        Ok(changed)
    }
}

fn delete_in_tx(conn: &Connection, set: &mut TaskSet, roots: &[TaskId]) -> Result<Vec<TaskId>> {
    if roots.is_empty() {
        return Ok(Vec::new());
    }
    let before = set.clone();
    let removed = remove_subtrees(set, roots);

    conn.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
    delete_rows(conn, &removed)?;
    persist_changes(conn, set, &before)?;
    Ok(removed)
}

/// Normalize and dedup contexts, keeping first-seen order.
fn dedup_contexts(contexts: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    contexts
        .iter()
        .filter_map(|c| normalize_context(c))
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
