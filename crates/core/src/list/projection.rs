//! Projection engine
//!
//! Derives the flat, due and upcoming views of the task list from a cache
//! snapshot plus the active status filter and search text. Pure and
//! infallible; safe to re-run redundantly.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::task::{Task, TaskStatus};

/// Status tab selected in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Todo,
    InProgress,
    Completed,
}

impl StatusFilter {
    /// The status this filter keeps, or `None` for all statuses
    pub fn status(self) -> Option<TaskStatus> {
        match self {
            Self::All => None,
            Self::Todo => Some(TaskStatus::Todo),
            Self::InProgress => Some(TaskStatus::InProgress),
            Self::Completed => Some(TaskStatus::Completed),
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        self.status().map_or(true, |status| task.status == status)
    }
}

impl From<TaskStatus> for StatusFilter {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Todo => Self::Todo,
            TaskStatus::InProgress => Self::InProgress,
            TaskStatus::Completed => Self::Completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            Some(status) => f.write_str(status.label()),
            None => f.write_str("All"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "all" => Ok(Self::All),
            "todo" | "to-do" => Ok(Self::Todo),
            "in-progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!("unknown status filter: {}", other)),
        }
    }
}

/// Display-ready views of the task list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Filtered tasks, newest first
    pub all: Vec<Task>,
    /// Due today or overdue; open work before completed work
    pub due: Vec<Task>,
    /// Due after today or undated; soonest first, undated last
    pub upcoming: Vec<Task>,
    pub has_results: bool,
}

/// Compute every view from `tasks` in one pass over the snapshot.
///
/// Filtering runs before bucketing, so a task hidden by the status filter or
/// the search is absent from all three views. Bucket membership depends only
/// on the due date relative to `today`.
pub fn project<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    filter: StatusFilter,
    search: &str,
    today: NaiveDate,
) -> Projection {
    let needle = search.trim().to_lowercase();

    let matched: Vec<&Task> = tasks
        .into_iter()
        .filter(|task| filter.matches(task))
        .filter(|task| needle.is_empty() || task.matches_search(&needle))
        .collect();

    let (mut due, mut upcoming): (Vec<&Task>, Vec<&Task>) =
        matched.iter().copied().partition(|task| task.is_due_by(today));
    due.sort_by(|a, b| due_order(a, b));
    upcoming.sort_by(|a, b| upcoming_order(a, b));

    let mut all = matched;
    all.sort_by(|a, b| newest_first(a, b));

    Projection {
        has_results: !all.is_empty(),
        all: all.into_iter().cloned().collect(),
        due: due.into_iter().cloned().collect(),
        upcoming: upcoming.into_iter().cloned().collect(),
    }
}

fn newest_first(a: &Task, b: &Task) -> Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

fn due_order(a: &Task, b: &Task) -> Ordering {
    a.status
        .is_completed()
        .cmp(&b.status.is_completed())
        .then(a.due_date.cmp(&b.due_date))
        .then(a.id.cmp(&b.id))
}

fn upcoming_order(a: &Task, b: &Task) -> Ordering {
    let by_date = match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then(a.id.cmp(&b.id))
}
