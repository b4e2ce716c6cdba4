//! Environment-driven configuration for the task list

use std::path::PathBuf;

const DATA_DIR_VAR: &str = "TASKFLOW_DATA_DIR";
const RESYNC_ON_ERROR_VAR: &str = "TASKFLOW_RESYNC_ON_ERROR";
const DEFAULT_DATA_DIR: &str = ".taskflow-data";

/// Settings for a [`crate::list::TaskList`] and its backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListConfig {
    /// Directory holding `tasks.json`
    pub data_dir: PathBuf,
    /// Reload the whole cache right after a failed durable write
    pub resync_on_error: bool,
}

impl Default for TaskListConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            resync_on_error: false,
        }
    }
}

impl TaskListConfig {
    /// Read the configuration from `TASKFLOW_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let resync_on_error = lookup(RESYNC_ON_ERROR_VAR)
            .map(|raw| parse_flag(&raw, defaults.resync_on_error))
            .unwrap_or(defaults.resync_on_error);

        Self {
            data_dir,
            resync_on_error,
        }
    }

    /// Override the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Path of the JSON task file inside the data directory
    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }
}

fn parse_flag(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
