//! Task list coordinator
//!
//! Owns the task cache, the active filter and search text, and publishes the
//! derived [`Projection`] to subscribers. Mutations are applied to the cache
//! and projected before the durable write is awaited, so subscribers observe
//! the change immediately. A failed write is reported to the caller and the
//! in-memory change is kept; the list is then marked stale until the next
//! successful full reload.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::cache::TaskCache;
use super::projection::{project, Projection, StatusFilter};
use crate::task::{Subtask, SubtaskId, Task, TaskId, TaskRepository, TaskStatus};
use crate::{Error, Result, StoreError, TaskListConfig};

/// Source of the current calendar day
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Lifecycle of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing loaded yet
    Uninitialized,
    /// The first full load completed
    Ready,
}

/// Parent of a subtask being added
#[derive(Debug, Clone)]
pub enum SubtaskParent {
    /// A task that already has a store identifier
    Existing(TaskId),
    /// A task that has not been saved yet; it is created first
    Draft(Task),
}

impl From<TaskId> for SubtaskParent {
    fn from(id: TaskId) -> Self {
        Self::Existing(id)
    }
}

impl From<Task> for SubtaskParent {
    fn from(task: Task) -> Self {
        if task.is_persisted() {
            Self::Existing(task.id)
        } else {
            Self::Draft(task)
        }
    }
}

/// The task list view model.
///
/// Every reload and mutation takes `&mut self`, so a reload can never start
/// while another one, or a mutation, is still running.
pub struct TaskList {
    store: Arc<dyn TaskRepository>,
    cache: TaskCache,
    state: CacheState,
    filter: StatusFilter,
    search: String,
    stale: bool,
    resync_on_error: bool,
    clock: Clock,
    projection_tx: watch::Sender<Projection>,
}

impl TaskList {
    /// Create an empty, uninitialized list backed by `store`
    pub fn new(store: Arc<dyn TaskRepository>) -> Self {
        let (projection_tx, _) = watch::channel(Projection::default());
        Self {
            store,
            cache: TaskCache::new(),
            state: CacheState::Uninitialized,
            filter: StatusFilter::default(),
            search: String::new(),
            stale: false,
            resync_on_error: false,
            clock: Arc::new(|| Local::now().date_naive()),
            projection_tx,
        }
    }

    /// Create a list using the given configuration
    pub fn with_config(store: Arc<dyn TaskRepository>, config: &TaskListConfig) -> Self {
        let mut list = Self::new(store);
        list.resync_on_error = config.resync_on_error;
        list
    }

    /// Replace the source of "today" used for due-date bucketing
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Subscribe to projection updates
    pub fn subscribe(&self) -> watch::Receiver<Projection> {
        self.projection_tx.subscribe()
    }

    /// The most recently computed projection
    pub fn projection(&self) -> Projection {
        self.projection_tx.borrow().clone()
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn cache(&self) -> &TaskCache {
        &self.cache
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.cache.get(id)
    }

    /// A durable write failed since the last successful full reload
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Cold start: load everything once. Later calls are no-ops.
    ///
    /// Returns whether a load ran.
    pub async fn activate(&mut self) -> Result<bool> {
        if self.state == CacheState::Ready {
            return Ok(false);
        }
        self.reload().await?;
        self.state = CacheState::Ready;
        Ok(true)
    }

    /// Explicit invalidation: reload everything from the store.
    ///
    /// Returns the number of tasks now cached.
    pub async fn refresh(&mut self) -> Result<usize> {
        if self.state == CacheState::Uninitialized {
            return Err(Error::InvalidState(
                "refresh requested before the first load".into(),
            ));
        }
        self.reload().await
    }

    /// Re-read a single task from the store, e.g. after it was edited elsewhere
    pub async fn refresh_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        let fetched = self
            .store
            .get_task(id)
            .await
            .map_err(Error::StoreUnavailable)?;

        match &fetched {
            Some(task) => {
                self.cache.upsert_local(task.clone())?;
            }
            None => {
                self.cache.remove_local(id);
            }
        }
        self.recompute();
        Ok(fetched)
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.recompute();
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if self.search != search {
            self.search = search;
            self.recompute();
        }
    }

    /// Persist a new task and add it to the cache under its store ID
    pub async fn create_task(&mut self, task: Task) -> Result<Task> {
        if task.is_persisted() {
            return Err(Error::InvalidState(format!(
                "task {} is already persisted",
                task.id
            )));
        }
        let task = task.normalized()?;

        let saved = self
            .store
            .save_task(task)
            .await
            .map_err(|e| Error::persistence("create task", e))?;

        self.cache.upsert_local(saved.clone())?;
        self.recompute();
        info!("Created task {}: {}", saved.id, saved.title);
        Ok(saved)
    }

    /// Apply edited fields to a cached task, then persist them
    pub async fn update_task(&mut self, task: Task) -> Result<Task> {
        let mut task = task.normalized()?;
        let Some(cached) = self.cache.get(task.id) else {
            return Err(Error::TaskNotFound(task.id));
        };
        task.subtasks = cached.subtasks.clone();
        task.updated_at = Utc::now();

        self.cache.upsert_local(task.clone())?;
        self.recompute();

        match self.store.save_task(task).await {
            Ok(saved) => {
                self.cache.upsert_local(saved.clone())?;
                self.recompute();
                info!("Updated task {}", saved.id);
                Ok(saved)
            }
            Err(e) => Err(self.persistence_failed("update task", e).await),
        }
    }

    /// Create or update depending on whether the task has a store ID
    pub async fn save_task(&mut self, task: Task) -> Result<Task> {
        if task.is_persisted() {
            self.update_task(task).await
        } else {
            self.create_task(task).await
        }
    }

    /// Remove a task and its subtasks from the list, then from the store
    pub async fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        let removed = self.cache.remove_local(id).ok_or(Error::TaskNotFound(id))?;
        self.recompute();

        match self.store.delete_task(id).await {
            Ok(0) => {
                warn!("Task {} was already gone from the store", id);
                Ok(removed)
            }
            Ok(_) => {
                info!("Deleted task {}", id);
                Ok(removed)
            }
            Err(e) => Err(self.persistence_failed("delete task", e).await),
        }
    }

    /// Advance a task to its next status, then persist it
    pub async fn cycle_status(&mut self, id: TaskId) -> Result<TaskStatus> {
        let task = self.cache.get_mut(id).ok_or(Error::TaskNotFound(id))?;
        task.status = task.status.next();
        task.updated_at = Utc::now();
        let status = task.status;
        let pending = task.clone();
        self.recompute();

        match self.store.save_task(pending).await {
            Ok(saved) => {
                self.cache.upsert_local(saved)?;
                self.recompute();
                info!("Task {} moved to {}", id, status);
                Ok(status)
            }
            Err(e) => Err(self.persistence_failed("update task status", e).await),
        }
    }

    /// Add a subtask. A draft parent is created first so the subtask can
    /// reference its store ID.
    ///
    /// If the parent was created but the subtask write fails, the error is
    /// [`Error::SubtaskNotSaved`] carrying the saved parent, so a retry can
    /// target it instead of creating the task again.
    pub async fn add_subtask(
        &mut self,
        parent: impl Into<SubtaskParent>,
        title: &str,
    ) -> Result<Subtask> {
        let subtask = Subtask::new(0, title).normalized()?;

        let (task_id, created) = match parent.into() {
            SubtaskParent::Existing(id) => {
                if !self.cache.contains(id) {
                    return Err(Error::TaskNotFound(id));
                }
                (id, None)
            }
            SubtaskParent::Draft(task) => {
                if task.title.trim().is_empty() {
                    return Err(Error::validation("Please enter a task title first"));
                }
                let created = self.create_task(task).await?;
                (created.id, Some(created))
            }
        };

        let saved = match self.store.save_subtask(Subtask { task_id, ..subtask }).await {
            Ok(saved) => saved,
            Err(source) => {
                warn!("Failed to add subtask to task {}: {}", task_id, source);
                return Err(match created {
                    Some(parent) => Error::SubtaskNotSaved {
                        parent: Box::new(parent),
                        source,
                    },
                    None => Error::persistence("add subtask", source),
                });
            }
        };

        if let Some(task) = self.cache.get_mut(task_id) {
            task.subtasks.push(saved.clone());
        }
        self.recompute();
        debug!("Added subtask {} to task {}", saved.id, task_id);
        Ok(saved)
    }

    /// Flip a subtask's completion flag, then persist it
    pub async fn toggle_subtask(
        &mut self,
        task_id: TaskId,
        subtask_id: SubtaskId,
    ) -> Result<Subtask> {
        let subtask = self
            .cache
            .subtask_mut(task_id, subtask_id)
            .ok_or(Error::SubtaskNotFound(subtask_id))?;
        subtask.is_completed = !subtask.is_completed;
        let pending = subtask.clone();
        self.recompute();

        match self.store.save_subtask(pending).await {
            Ok(saved) => {
                debug!("Toggled subtask {} of task {}", subtask_id, task_id);
                Ok(saved)
            }
            Err(e) => Err(self.persistence_failed("toggle subtask", e).await),
        }
    }

    /// Remove a subtask from the list, then from the store
    pub async fn delete_subtask(
        &mut self,
        task_id: TaskId,
        subtask_id: SubtaskId,
    ) -> Result<Subtask> {
        let task = self
            .cache
            .get_mut(task_id)
            .ok_or(Error::TaskNotFound(task_id))?;
        let index = task
            .subtasks
            .iter()
            .position(|s| s.id == subtask_id)
            .ok_or(Error::SubtaskNotFound(subtask_id))?;
        let removed = task.subtasks.remove(index);
        self.recompute();

        match self.store.delete_subtask(subtask_id).await {
            Ok(_) => {
                debug!("Deleted subtask {} of task {}", subtask_id, task_id);
                Ok(removed)
            }
            Err(e) => Err(self.persistence_failed("delete subtask", e).await),
        }
    }

    /// Replace the cache from the store and re-project
    async fn reload(&mut self) -> Result<usize> {
        let count = self.cache.load(self.store.as_ref()).await?;
        self.stale = false;
        self.recompute();
        info!("Loaded {} tasks", count);
        Ok(count)
    }

    fn recompute(&self) {
        let today = (self.clock)();
        let projection = project(self.cache.iter(), self.filter, &self.search, today);
        debug!(
            "Projected {} tasks ({} due, {} upcoming) for filter {}",
            projection.all.len(),
            projection.due.len(),
            projection.upcoming.len(),
            self.filter
        );
        self.projection_tx.send_replace(projection);
    }

    /// Record a failed durable write and turn it into the caller-facing error
    async fn persistence_failed(&mut self, operation: &'static str, source: StoreError) -> Error {
        warn!(
            "Failed to {}: {}; in-memory list has diverged from the store",
            operation, source
        );
        self.stale = true;

        if self.resync_on_error && self.state == CacheState::Ready {
            match self.reload().await {
                Ok(count) => info!("Re-synced {} tasks after failed write", count),
                Err(e) => warn!("Re-sync after failed write did not complete: {}", e),
            }
        }

        Error::persistence(operation, source)
    }
}
