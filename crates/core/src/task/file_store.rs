//! File-based task storage implementation
//!
//! Stores tasks and subtasks as JSON in a file on disk.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

use super::model::{Subtask, SubtaskId, Task, TaskId, TaskStatus, UNSAVED_ID};
use super::repository::TaskRepository;
use crate::{StoreError, StoreResult};

/// On-disk layout of the task file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    last_task_id: TaskId,
    #[serde(default)]
    last_subtask_id: SubtaskId,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    subtasks: Vec<Subtask>,
}

#[derive(Debug, Default)]
struct StoreState {
    last_task_id: TaskId,
    last_subtask_id: SubtaskId,
    /// Task rows, kept without their subtasks
    tasks: HashMap<TaskId, Task>,
    subtasks: HashMap<SubtaskId, Subtask>,
}

impl StoreState {
    fn subtasks_of(&self, task_id: TaskId) -> Vec<Subtask> {
        let mut subtasks: Vec<Subtask> = self
            .subtasks
            .values()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect();
        subtasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        subtasks
    }

    fn with_subtasks(&self, task: &Task) -> Task {
        let mut task = task.clone();
        task.subtasks = self.subtasks_of(task.id);
        task
    }

    /// Tasks matching `keep`, newest first, with subtasks attached
    fn collect_tasks(&self, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| keep(*t))
            .map(|t| self.with_subtasks(t))
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tasks
    }
}

/// File-based task store using JSON
pub struct FileTaskStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory mirror of the file
    state: RwLock<StoreState>,
}

impl FileTaskStore {
    /// Create a new FileTaskStore
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn new(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let file = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str::<StoreFile>(&content)?
        } else {
            StoreFile::default()
        };

        let state = StoreState {
            last_task_id: file.last_task_id,
            last_subtask_id: file.last_subtask_id,
            tasks: file
                .tasks
                .into_iter()
                .map(|mut t| {
                    t.subtasks.clear();
                    (t.id, t)
                })
                .collect(),
            subtasks: file.subtasks.into_iter().map(|s| (s.id, s)).collect(),
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Persist the state to disk
    async fn persist(&self) -> StoreResult<()> {
        let content = {
            let state = self.state.read().await;
            let mut tasks: Vec<&Task> = state.tasks.values().collect();
            tasks.sort_by_key(|t| t.id);
            let mut subtasks: Vec<&Subtask> = state.subtasks.values().collect();
            subtasks.sort_by_key(|s| s.id);

            #[derive(Serialize)]
            struct StoreFileRef<'a> {
                last_task_id: TaskId,
                last_subtask_id: SubtaskId,
                tasks: Vec<&'a Task>,
                subtasks: Vec<&'a Subtask>,
            }

            serde_json::to_string_pretty(&StoreFileRef {
                last_task_id: state.last_task_id,
                last_subtask_id: state.last_subtask_id,
                tasks,
                subtasks,
            })?
        };

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        debug!("Persisted task store to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for FileTaskStore {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state.collect_tasks(|_| true))
    }

    async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.get(&id).map(|t| state.with_subtasks(t)))
    }

    async fn find_by_status(&self, status: TaskStatus) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state.collect_tasks(|t| t.status == status))
    }

    async fn save_task(&self, mut task: Task) -> StoreResult<Task> {
        let now = Utc::now();
        task.updated_at = now;
        task.subtasks.clear();

        let saved = {
            let mut state = self.state.write().await;
            if task.id == UNSAVED_ID {
                state.last_task_id += 1;
                task.id = state.last_task_id;
                task.created_at = now;
            } else if !state.tasks.contains_key(&task.id) {
                return Err(StoreError::NotFound(format!("task {}", task.id)));
            }
            state.tasks.insert(task.id, task.clone());
            state.with_subtasks(&task)
        };

        self.persist().await?;
        Ok(saved)
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<usize> {
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.tasks.remove(&id).is_some();
            state.subtasks.retain(|_, s| s.task_id != id);
            removed
        };
        if removed {
            self.persist().await?;
        }
        Ok(usize::from(removed))
    }

    async fn list_subtasks(&self, task_id: TaskId) -> StoreResult<Vec<Subtask>> {
        let state = self.state.read().await;
        Ok(state.subtasks_of(task_id))
    }

    async fn save_subtask(&self, mut subtask: Subtask) -> StoreResult<Subtask> {
        {
            let mut state = self.state.write().await;
            if !state.tasks.contains_key(&subtask.task_id) {
                return Err(StoreError::NotFound(format!("task {}", subtask.task_id)));
            }
            if subtask.id == UNSAVED_ID {
                state.last_subtask_id += 1;
                subtask.id = state.last_subtask_id;
                subtask.created_at = Utc::now();
            } else if !state.subtasks.contains_key(&subtask.id) {
                return Err(StoreError::NotFound(format!("subtask {}", subtask.id)));
            }
            state.subtasks.insert(subtask.id, subtask.clone());
        }

        self.persist().await?;
        Ok(subtask)
    }

    async fn delete_subtask(&self, id: SubtaskId) -> StoreResult<usize> {
        let removed = {
            let mut state = self.state.write().await;
            state.subtasks.remove(&id).is_some()
        };
        if removed {
            self.persist().await?;
        }
        Ok(usize::from(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (FileTaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");
        let store = FileTaskStore::new(&path).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let (store, _temp) = create_test_store().await;

        let first = store
            .save_task(Task::new("Test task").with_description("A test description"))
            .await
            .unwrap();
        let second = store.save_task(Task::new("Another")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.title, "Test task");
        assert_eq!(first.description, "A test description");
    }

    #[tokio::test]
    async fn test_get_task() {
        let (store, _temp) = create_test_store().await;

        let id = store.save_task(Task::new("Test task")).await.unwrap().id;

        let retrieved = store.get_task(id).await.unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().id, id);

        // Test non-existent task
        let non_existent = store.get_task(999).await.unwrap();
        assert!(non_existent.is_none());
    }

    #[tokio::test]
    async fn test_list_tasks_newest_first() {
        let (store, _temp) = create_test_store().await;

        store.save_task(Task::new("Task 1")).await.unwrap();
        store.save_task(Task::new("Task 2")).await.unwrap();
        store.save_task(Task::new("Task 3")).await.unwrap();

        let tasks = store.list_tasks().await.unwrap();
        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_update_task_stamps_updated_at() {
        let (store, _temp) = create_test_store().await;

        let created = store.save_task(Task::new("Original title")).await.unwrap();

        let mut edited = created.clone();
        edited.title = "Updated title".to_string();
        edited.status = TaskStatus::InProgress;

        let result = store.save_task(edited).await.unwrap();
        assert_eq!(result.id, created.id);
        assert_eq!(result.title, "Updated title");
        assert_eq!(result.status, TaskStatus::InProgress);
        assert_eq!(result.created_at, created.created_at);
        assert!(result.updated_at >= created.updated_at);

        let retrieved = store.get_task(created.id).await.unwrap().unwrap();
        assert_eq!(retrieved.title, "Updated title");
    }

    #[tokio::test]
    async fn test_update_nonexistent_task() {
        let (store, _temp) = create_test_store().await;

        let mut task = Task::new("Test task");
        task.id = 42;
        let result = store.save_task(task).await;

        match result.unwrap_err() {
            StoreError::NotFound(_) => {}
            e => panic!("Expected NotFound error, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_delete_task_cascades_subtasks() {
        let (store, _temp) = create_test_store().await;

        let keep = store.save_task(Task::new("Keep")).await.unwrap();
        let doomed = store.save_task(Task::new("Task to delete")).await.unwrap();
        store
            .save_subtask(Subtask::new(doomed.id, "child"))
            .await
            .unwrap();
        store
            .save_subtask(Subtask::new(keep.id, "other child"))
            .await
            .unwrap();

        assert_eq!(store.delete_task(doomed.id).await.unwrap(), 1);
        assert!(store.get_task(doomed.id).await.unwrap().is_none());
        assert!(store.list_subtasks(doomed.id).await.unwrap().is_empty());
        assert_eq!(store.list_subtasks(keep.id).await.unwrap().len(), 1);

        // Delete again should report nothing removed
        assert_eq!(store.delete_task(doomed.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_status() {
        let (store, _temp) = create_test_store().await;

        store.save_task(Task::new("Todo 1")).await.unwrap();
        store.save_task(Task::new("Todo 2")).await.unwrap();
        store
            .save_task(Task::new("In Progress 1").with_status(TaskStatus::InProgress))
            .await
            .unwrap();

        let todos = store.find_by_status(TaskStatus::Todo).await.unwrap();
        assert_eq!(todos.len(), 2);

        let in_progress = store.find_by_status(TaskStatus::InProgress).await.unwrap();
        assert_eq!(in_progress.len(), 1);

        let completed = store.find_by_status(TaskStatus::Completed).await.unwrap();
        assert!(completed.is_empty());
    }

    #[tokio::test]
    async fn test_subtasks_attached_in_creation_order() {
        let (store, _temp) = create_test_store().await;

        let task = store.save_task(Task::new("Parent")).await.unwrap();
        let first = store
            .save_subtask(Subtask::new(task.id, "first"))
            .await
            .unwrap();
        store
            .save_subtask(Subtask::new(task.id, "second"))
            .await
            .unwrap();

        let mut toggled = first.clone();
        toggled.is_completed = true;
        store.save_subtask(toggled).await.unwrap();

        let loaded = store.get_task(task.id).await.unwrap().unwrap();
        let titles: Vec<&str> = loaded.subtasks.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert!(loaded.subtasks[0].is_completed);

        assert_eq!(store.delete_subtask(first.id).await.unwrap(), 1);
        assert_eq!(store.list_subtasks(task.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subtask_requires_existing_task() {
        let (store, _temp) = create_test_store().await;

        let result = store.save_subtask(Subtask::new(7, "orphan")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");

        let task_id;

        // Create store and add task
        {
            let store = FileTaskStore::new(&path).await.unwrap();
            let task = store
                .save_task(Task::new("Persistent task").with_description("Should survive reload"))
                .await
                .unwrap();
            task_id = task.id;
            store
                .save_subtask(Subtask::new(task_id, "nested"))
                .await
                .unwrap();
        }

        // Create new store instance and verify data persisted
        {
            let store = FileTaskStore::new(&path).await.unwrap();
            let task = store.get_task(task_id).await.unwrap().unwrap();
            assert_eq!(task.title, "Persistent task");
            assert_eq!(task.description, "Should survive reload");
            assert_eq!(task.subtasks.len(), 1);

            // Counters survive too
            let next = store.save_task(Task::new("Next")).await.unwrap();
            assert_eq!(next.id, task_id + 1);
        }
    }
}
