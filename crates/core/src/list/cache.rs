//! In-memory task cache
//!
//! Holds the authoritative mirror of every persisted task, keyed by ID.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::task::{Subtask, SubtaskId, Task, TaskId, TaskRepository};
use crate::{Error, Result};

/// Snapshot of all persisted tasks and their subtasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCache {
    tasks: BTreeMap<TaskId, Task>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot with the store's current task set.
    ///
    /// On failure the previous contents are kept untouched.
    pub async fn load(&mut self, store: &dyn TaskRepository) -> Result<usize> {
        let tasks = store.list_tasks().await.map_err(Error::StoreUnavailable)?;
        self.replace_all(tasks);
        debug!("Loaded {} tasks into cache", self.tasks.len());
        Ok(self.tasks.len())
    }

    /// Swap in a complete task set, dropping anything that breaks the cache invariants
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let mut fresh = BTreeMap::new();
        for task in tasks {
            if !task.is_persisted() {
                warn!("Ignoring unsaved task '{}' from store", task.title);
                continue;
            }
            let task = Self::without_foreign_subtasks(task);
            if let Some(previous) = fresh.insert(task.id, task) {
                warn!("Duplicate task {} from store, keeping the last copy", previous.id);
            }
        }
        self.tasks = fresh;
    }

    /// Insert or replace a single task without touching the store
    pub fn upsert_local(&mut self, task: Task) -> Result<Option<Task>> {
        if !task.is_persisted() {
            return Err(Error::InvalidState(format!(
                "task '{}' has no store identifier",
                task.title
            )));
        }
        let task = Self::without_foreign_subtasks(task);
        Ok(self.tasks.insert(task.id, task))
    }

    /// Remove a task, and with it its subtasks, without touching the store
    pub fn remove_local(&mut self, id: TaskId) -> Option<Task> {
        self.tasks.remove(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub(crate) fn subtask_mut(
        &mut self,
        task_id: TaskId,
        subtask_id: SubtaskId,
    ) -> Option<&mut Subtask> {
        self.tasks
            .get_mut(&task_id)?
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Every cached task, in ID order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn without_foreign_subtasks(mut task: Task) -> Task {
        let owner = task.id;
        let before = task.subtasks.len();
        task.subtasks.retain(|s| s.task_id == owner);
        if task.subtasks.len() != before {
            warn!(
                "Dropped {} subtasks not owned by task {}",
                before - task.subtasks.len(),
                owner
            );
        }
        task
    }
}
