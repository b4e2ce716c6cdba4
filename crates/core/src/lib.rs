//! Core library for TaskFlow
//!
//! This crate contains the task list engine, including:
//! - Task and subtask models
//! - The task store contract and a JSON file store
//! - The in-memory task cache, projection engine and mutation coordinator

pub mod config;
pub mod error;
pub mod list;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use config::TaskListConfig;
pub use error::{Error, StoreError, StoreResult};
pub type Result<T> = std::result::Result<T, Error>;
