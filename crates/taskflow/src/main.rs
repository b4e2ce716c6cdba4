//! TaskFlow command-line surface
//!
//! Drives the task list against the JSON file store and prints the
//! resulting views as JSON.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, ListArgs};
use taskflow_core::list::TaskList;
use taskflow_core::task::{FileTaskStore, Task};
use taskflow_core::TaskListConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskflow=info,taskflow_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = TaskListConfig::from_env();
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    tracing::info!("Using data directory: {:?}", config.data_dir);

    let store = FileTaskStore::new(config.tasks_path())
        .await
        .context("Failed to open task store")?;
    let mut list = TaskList::with_config(Arc::new(store), &config);
    list.activate().await.context("Failed to load tasks")?;

    let command = cli.command.unwrap_or(Command::List(ListArgs::default()));
    apply(&mut list, command).await?;

    print_views(&list)
}

async fn apply(list: &mut TaskList, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List(args) => {
            list.set_filter(args.filter);
            list.set_search(args.search);
        }
        Command::Add(args) => {
            let mut task = Task::new(args.title).with_description(args.description);
            task.due_date = args.due;
            list.create_task(task).await?;
        }
        Command::Cycle { id } => {
            list.cycle_status(id).await?;
        }
        Command::Delete { id } => {
            list.delete_task(id).await?;
        }
        Command::SubtaskAdd { task_id, title } => {
            list.add_subtask(task_id, &title).await?;
        }
        Command::SubtaskToggle {
            task_id,
            subtask_id,
        } => {
            list.toggle_subtask(task_id, subtask_id).await?;
        }
        Command::SubtaskDelete {
            task_id,
            subtask_id,
        } => {
            list.delete_subtask(task_id, subtask_id).await?;
        }
    }
    Ok(())
}

fn print_views(list: &TaskList) -> anyhow::Result<()> {
    let now = Local::now().naive_local();
    let projection = list.projection();

    let rows = |tasks: &[Task]| -> Vec<serde_json::Value> {
        tasks
            .iter()
            .map(|task| {
                json!({
                    "id": task.id,
                    "title": task.title,
                    "status": task.status.label(),
                    "due": task.due_label(now),
                    "overdue": task.is_overdue(now.date()),
                    "subtasks": task.subtask_progress().map(|p| p.to_string()),
                })
            })
            .collect()
    };

    let output = json!({
        "filter": list.filter().to_string(),
        "search": list.search(),
        "has_results": projection.has_results,
        "stale": list.is_stale(),
        "all": rows(&projection.all),
        "due": rows(&projection.due),
        "upcoming": rows(&projection.upcoming),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
