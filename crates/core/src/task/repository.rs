//! Task repository trait
//!
//! Defines the interface for durable task storage.

use async_trait::async_trait;

use super::model::{Subtask, SubtaskId, Task, TaskId, TaskStatus};
use crate::StoreResult;

/// Repository interface for task and subtask CRUD operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Get all tasks, each populated with its subtasks
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;

    /// Get a task by ID, populated with its subtasks
    async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Find tasks by status
    async fn find_by_status(&self, status: TaskStatus) -> StoreResult<Vec<Task>>;

    /// Insert the task when it has no ID, otherwise update it.
    ///
    /// Always stamps `updated_at`. Returns the stored record with its ID.
    async fn save_task(&self, task: Task) -> StoreResult<Task>;

    /// Delete a task together with its subtasks, returning the deleted task count
    async fn delete_task(&self, id: TaskId) -> StoreResult<usize>;

    /// Get the subtasks of a task, oldest first
    async fn list_subtasks(&self, task_id: TaskId) -> StoreResult<Vec<Subtask>>;

    /// Insert the subtask when it has no ID, otherwise update it
    async fn save_subtask(&self, subtask: Subtask) -> StoreResult<Subtask>;

    /// Delete a subtask, returning the deleted count
    async fn delete_subtask(&self, id: SubtaskId) -> StoreResult<usize>;
}
