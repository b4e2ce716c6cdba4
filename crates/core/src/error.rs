//! Error types for the core library

use thiserror::Error;

use crate::task::{SubtaskId, Task, TaskId};

/// Result type alias for task store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures raised by a task store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the task list and its mutation entry points
#[derive(Error, Debug)]
pub enum Error {
    /// User input failed a precondition; nothing was mutated
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A full load could not reach the store; the cache kept its contents
    #[error("Task store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// A durable write failed after the in-memory change was applied
    #[error("Failed to {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// A draft parent was created but its first subtask was not saved.
    ///
    /// The parent is in the store and the cache; retry against its ID.
    #[error("Saved task {} but failed to add subtask: {source}", .parent.id)]
    SubtaskNotSaved {
        parent: Box<Task>,
        #[source]
        source: StoreError,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Subtask not found: {0}")]
    SubtaskNotFound(SubtaskId),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a Persistence error for the named operation
    pub fn persistence(operation: &'static str, source: StoreError) -> Self {
        Self::Persistence { operation, source }
    }

    /// The task that was saved on the way to a failure, if any
    pub fn saved_parent(&self) -> Option<&Task> {
        match self {
            Self::SubtaskNotSaved { parent, .. } => Some(&**parent),
            _ => None,
        }
    }

    /// Whether the in-memory state may have diverged from the store
    pub fn is_divergent(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
