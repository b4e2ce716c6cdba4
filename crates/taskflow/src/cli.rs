//! Command-line arguments

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use taskflow_core::list::StatusFilter;
use taskflow_core::task::{SubtaskId, TaskId};

#[derive(Parser)]
#[command(name = "taskflow", about = "A to-do list with due and upcoming views", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding tasks.json (overrides TASKFLOW_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the task views
    List(ListArgs),
    /// Add a task
    Add(AddArgs),
    /// Advance a task to its next status
    Cycle { id: TaskId },
    /// Delete a task and its subtasks
    Delete { id: TaskId },
    /// Add a subtask to a task
    SubtaskAdd { task_id: TaskId, title: String },
    /// Toggle a subtask's completion
    SubtaskToggle {
        task_id: TaskId,
        subtask_id: SubtaskId,
    },
    /// Delete a subtask
    SubtaskDelete {
        task_id: TaskId,
        subtask_id: SubtaskId,
    },
}

#[derive(Args, Default)]
pub struct ListArgs {
    /// Status tab: all, todo, in-progress or completed
    #[arg(long, default_value = "all")]
    pub filter: StatusFilter,

    /// Only tasks whose title or description contain this text
    #[arg(long, default_value = "")]
    pub search: String,
}

#[derive(Args)]
pub struct AddArgs {
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Due date as YYYY-MM-DD
    #[arg(long)]
    pub due: Option<NaiveDate>,
}
