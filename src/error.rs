//! Structured error types for board operations.

use crate::types::TaskId;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,

    // Integrity errors
    DanglingParent,
    CycleDetected,
    IdOverflow,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Errors surfaced by board operations.
///
/// Validation rejections of moves are not errors; see `MoveOutcome`.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// A task references a parent that does not exist.
    #[error("Task {task_id} references missing parent {parent_id}")]
    DanglingParent { task_id: TaskId, parent_id: TaskId },

    /// A task is reachable from itself through parent links.
    #[error("Task {0} is part of a parent cycle")]
    Cycle(TaskId),

    #[error("Task id {id} does not fit in a {width}-digit path segment")]
    IdOverflow { id: TaskId, width: usize },

    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    Internal(String),
}

impl BoardError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BoardError::InvalidValue { .. } => ErrorCode::InvalidFieldValue,
            BoardError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            BoardError::DanglingParent { .. } => ErrorCode::DanglingParent,
            BoardError::Cycle(_) => ErrorCode::CycleDetected,
            BoardError::IdOverflow { .. } => ErrorCode::IdOverflow,
            BoardError::Database(_) => ErrorCode::DatabaseError,
            BoardError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        BoardError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn database(err: impl fmt::Display) -> Self {
        BoardError::Database(err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        BoardError::Internal(err.to_string())
    }

    /// Integrity violations indicate upstream corruption rather than bad input.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            BoardError::DanglingParent { .. } | BoardError::Cycle(_) | BoardError::IdOverflow { .. }
        )
    }

    /// JSON form for machine-readable CLI output.
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(err: rusqlite::Error) -> Self {
        BoardError::database(err)
    }
}

// Storage functions return anyhow; recover the typed error when there is one.
impl From<anyhow::Error> for BoardError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<BoardError>() {
            Ok(board_err) => board_err,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(sql_err) => BoardError::database(sql_err),
                Err(err) => BoardError::internal(err),
            },
        }
    }
}
