//! Core types for the GTD board.

use crate::error::BoardError;
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task identifier. Assigned by the store at creation and never changed.
pub type TaskId = i64;

/// Board column a task lives in.
///
/// Declaration order is the display order of the columns and is used when
/// views sort by status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum TaskStatus {
    Inbox,
    NextActions,
    Projects,
    Someday,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Inbox,
        TaskStatus::NextActions,
        TaskStatus::Projects,
        TaskStatus::Someday,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "Inbox",
            TaskStatus::NextActions => "NextActions",
            TaskStatus::Projects => "Projects",
            TaskStatus::Someday => "Someday",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| BoardError::invalid_value("status", &format!("unknown status '{}'", s)))
    }
}

/// Task priority. Ordered so that `High` sorts last ascending.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(BoardError::invalid_value(
                "priority",
                &format!("unknown priority '{}'", s),
            )),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A task on the board.
///
/// Only `parent_id` is a persisted link. Children are always rebuilt from the
/// flat task set; `path` and `depth` are derived and recomputed after every
/// structural change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub is_completed: bool,
    /// Status held before completion, restored when completion is undone.
    #[serde(default)]
    pub original_status: Option<TaskStatus>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default = "default_true")]
    pub is_expanded: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub depth: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Task {
    /// Create an unpersisted task with the given identity and placement.
    pub fn new(id: TaskId, title: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            status,
            parent_id: None,
            sort_order: 0,
            is_completed: false,
            original_status: None,
            start_date: None,
            due_date: None,
            contexts: Vec::new(),
            is_expanded: true,
            is_hidden: false,
            path: String::new(),
            depth: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Sibling-ordering scope of this task.
    pub fn scope(&self) -> Scope {
        Scope {
            parent_id: self.parent_id,
            status: self.status,
        }
    }
}

/// The `{parent_id, status}` pair that defines a sibling-ordering group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub parent_id: Option<TaskId>,
    pub status: TaskStatus,
}

impl Scope {
    pub fn new(parent_id: Option<TaskId>, status: TaskStatus) -> Self {
        Self { parent_id, status }
    }
}

/// A task with its children for hierarchical views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTree {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TaskTree>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub contexts: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            title: title.into(),
            status,
            parent_id: None,
            priority: Priority::Medium,
            description: None,
            start_date: None,
            due_date: None,
            contexts: Vec::new(),
        }
    }

    pub fn under(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Relocate a selection of tasks to `{new_status, new_parent_id}` at
/// `insertion_index` among the destination siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub task_ids: Vec<TaskId>,
    pub new_status: TaskStatus,
    #[serde(default)]
    pub new_parent_id: Option<TaskId>,
    /// Clamped into `[0, destination sibling count]`.
    #[serde(default)]
    pub insertion_index: i64,
}

impl MoveRequest {
    pub fn new(
        task_ids: Vec<TaskId>,
        new_status: TaskStatus,
        new_parent_id: Option<TaskId>,
        insertion_index: i64,
    ) -> Self {
        Self {
            task_ids,
            new_status,
            new_parent_id,
            insertion_index,
        }
    }

    pub fn destination(&self) -> Scope {
        Scope::new(self.new_parent_id, self.new_status)
    }
}

/// Why a move was declined without touching any task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// No ids were given.
    EmptySelection,
    /// None of the given ids exist.
    StaleIds,
    /// The destination parent is one of the moved tasks or their descendants.
    Cycle,
    /// The destination parent does not exist.
    MissingParent,
}

impl NoOpReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoOpReason::EmptySelection => "empty selection",
            NoOpReason::StaleIds => "no selected task exists",
            NoOpReason::Cycle => "destination is inside the moved subtree",
            NoOpReason::MissingParent => "destination parent does not exist",
        }
    }
}

/// Result of a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MoveOutcome {
    Applied {
        /// Move roots in their new sibling order.
        roots: Vec<TaskId>,
        /// Selected tasks plus all of their descendants.
        affected: usize,
    },
    NoOp {
        reason: NoOpReason,
    },
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MoveOutcome::Applied { .. })
    }
}

/// Result of a completion toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionChange {
    /// New completion state of the toggled task.
    pub completed: bool,
    /// Every task whose completion state changed, toggled task first.
    pub cascaded: Vec<TaskId>,
}

/// Field edits applied to many tasks at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdate {
    pub task_ids: Vec<TaskId>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub context_to_add: Option<String>,
    #[serde(default)]
    pub context_to_remove: Option<String>,
}

/// Normalize a context tag to its `@`-prefixed form.
pub fn normalize_context(context: &str) -> Option<String> {
    let trimmed = context.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with('@') {
        Some(trimmed.to_string())
    } else {
        Some(format!("@{}", trimmed))
    }
}
