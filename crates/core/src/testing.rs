//! Test helpers shared by unit tests across the crate

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use tempfile::TempDir;

use crate::task::{
    FileTaskStore, Subtask, SubtaskId, Task, TaskId, TaskRepository, TaskStatus,
};
use crate::{StoreError, StoreResult};

/// Wraps a [`FileTaskStore`] and fails reads or writes on demand
pub struct FlakyStore {
    inner: FileTaskStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_subtask_saves: AtomicUsize,
    calls: AtomicUsize,
    _dir: TempDir,
}

impl FlakyStore {
    pub async fn new() -> Arc<Self> {
        let dir = TempDir::new().unwrap();
        let inner = FileTaskStore::new(dir.path().join("tasks.json"))
            .await
            .unwrap();
        Arc::new(Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            failing_subtask_saves: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            _dir: dir,
        })
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Refuse the next `count` subtask saves, then behave normally
    pub fn fail_next_subtask_saves(&self, count: usize) {
        self.failing_subtask_saves.store(count, Ordering::SeqCst);
    }

    /// Number of store calls made through the wrapper
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Access the wrapped store directly, bypassing failure injection and counting
    pub fn inner(&self) -> &FileTaskStore {
        &self.inner
    }

    fn read(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".into()));
        }
        Ok(())
    }

    fn write(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for FlakyStore {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.read()?;
        self.inner.list_tasks().await
    }

    async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.read()?;
        self.inner.get_task(id).await
    }

    async fn find_by_status(&self, status: TaskStatus) -> StoreResult<Vec<Task>> {
        self.read()?;
        self.inner.find_by_status(status).await
    }

    async fn save_task(&self, task: Task) -> StoreResult<Task> {
        self.write()?;
        self.inner.save_task(task).await
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<usize> {
        self.write()?;
        self.inner.delete_task(id).await
    }

    async fn list_subtasks(&self, task_id: TaskId) -> StoreResult<Vec<Subtask>> {
        self.read()?;
        self.inner.list_subtasks(task_id).await
    }

    async fn save_subtask(&self, subtask: Subtask) -> StoreResult<Subtask> {
        self.write()?;
        let refused = self
            .failing_subtask_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StoreError::Unavailable("subtask write refused".into()));
        }
        self.inner.save_subtask(subtask).await
    }

    async fn delete_subtask(&self, id: SubtaskId) -> StoreResult<usize> {
        self.write()?;
        self.inner.delete_subtask(id).await
    }
}

/// Fixed "today" used by projection tests
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

/// A persisted-looking task whose creation time grows with its id
pub fn task(id: TaskId, status: TaskStatus, due: Option<NaiveDate>) -> Task {
    let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + TimeDelta::minutes(id);
    Task {
        id,
        title: format!("Task {}", id),
        description: String::new(),
        status,
        due_date: due,
        created_at: created,
        updated_at: created,
        subtasks: Vec::new(),
    }
}
