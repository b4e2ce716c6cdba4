//! Task model definitions

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Store-assigned task identifier
pub type TaskId = i64;

/// Store-assigned subtask identifier
pub type SubtaskId = i64;

/// Identifier carried by records that have not been persisted yet
pub const UNSAVED_ID: i64 = 0;

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 2000;
pub const SUBTASK_TITLE_MAX_LEN: usize = 200;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Completed];

    /// The status reached by a quick toggle: Todo -> InProgress -> Completed -> Todo
    pub fn next(self) -> Self {
        match self {
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Completed,
            Self::Completed => Self::Todo,
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A checklist item owned by a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub task_id: TaskId,
    pub title: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    /// Create an unsaved subtask for the given task
    pub fn new(task_id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            task_id,
            title: title.into(),
            is_completed: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED_ID
    }

    /// Trim the title and check it against the length bounds
    pub fn normalized(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(Error::validation("Subtask title must not be blank"));
        }
        if self.title.chars().count() > SUBTASK_TITLE_MAX_LEN {
            return Err(Error::validation(format!(
                "Subtask title exceeds {} characters",
                SUBTASK_TITLE_MAX_LEN
            )));
        }
        Ok(self)
    }
}

/// Completed versus total subtasks of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtaskProgress {
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for SubtaskProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// A to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owned subtasks, ordered by creation time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Create an unsaved task with the given title
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UNSAVED_ID,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            due_date: None,
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED_ID
    }

    /// Trim text fields and check them against the length bounds
    pub fn normalized(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();

        if self.title.is_empty() {
            return Err(Error::validation("Please enter a task title"));
        }
        if self.title.chars().count() > TITLE_MAX_LEN {
            return Err(Error::validation(format!(
                "Task title exceeds {} characters",
                TITLE_MAX_LEN
            )));
        }
        if self.description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(Error::validation(format!(
                "Task description exceeds {} characters",
                DESCRIPTION_MAX_LEN
            )));
        }
        Ok(self)
    }

    /// Due today or earlier. Completion does not matter here.
    pub fn is_due_by(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due <= today)
    }

    /// Due strictly before today and not completed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_completed() && self.due_date.is_some_and(|due| due < today)
    }

    /// Case-insensitive substring match against title or description.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }

    pub fn subtask_progress(&self) -> Option<SubtaskProgress> {
        if self.subtasks.is_empty() {
            return None;
        }
        Some(SubtaskProgress {
            completed: self.subtasks.iter().filter(|s| s.is_completed).count(),
            total: self.subtasks.len(),
        })
    }

    /// Human readable due date, with the time left when the task is still open
    pub fn due_label(&self, now: NaiveDateTime) -> String {
        let Some(due) = self.due_date else {
            return "No due date".to_string();
        };
        let date = due.format("%b %d, %Y").to_string();

        if self.status.is_completed() || self.is_overdue(now.date()) {
            return date;
        }

        // Last second of the due day
        let deadline = due.and_time(NaiveTime::MIN) + TimeDelta::days(1) - TimeDelta::seconds(1);
        let left = deadline - now;
        if left.num_seconds() <= 0 {
            return date;
        }

        let remaining = if left.num_days() >= 1 {
            format!("{}d", left.num_days())
        } else if left.num_hours() >= 1 {
            format!("{}h", left.num_hours())
        } else {
            format!("{}m", left.num_minutes())
        };
        format!("{} - {}", date, remaining)
    }
}
