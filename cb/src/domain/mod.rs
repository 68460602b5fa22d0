//! Domain types for the connector builder
//!
//! Tasks and the task list that tracks the build workflow, their read-only
//! progress projections, and line-addressed manifest editing.

pub mod manifest;
mod task;
mod task_list;
mod view;

pub use manifest::{EMPTY_MANIFEST, EXAMPLE_MANIFEST, ManifestEdit, ManifestError};
pub use task::{Task, TaskCategory, TaskError, TaskKind, TaskStatus};
pub use task_list::{TaskList, TaskSummary};
pub use view::{ProgressView, TaskListHeader, TaskView};
