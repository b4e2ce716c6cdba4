//! Task list engine
//!
//! The in-memory task cache, the projection engine deriving the list views,
//! and the coordinator that applies mutations optimistically.

mod cache;
mod projection;
mod task_list;

pub use cache::TaskCache;
pub use projection::{project, Projection, StatusFilter};
pub use task_list::{CacheState, Clock, SubtaskParent, TaskList};
