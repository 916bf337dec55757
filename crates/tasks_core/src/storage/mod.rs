//! Task persistence boundary.
//!
//! The router only ever talks to a [`TaskStore`]; which backend sits behind it
//! is decided by whoever builds the router.

pub mod json_store;
pub mod memory_store;

use crate::error::AppError;
use crate::model::{NewTask, Task, TaskId};
use thiserror::Error;
use time::OffsetDateTime;

pub use json_store::JsonFileStore;
pub use memory_store::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    Rejected(String),
    #[error("io: {0}")]
    Io(String),
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::store(err.to_string())
    }
}

/// Which store call an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Insert,
    UpdateCompletion,
    SelectOpen,
}

pub trait TaskStore: Send + Sync {
    fn insert(&self, task: NewTask) -> Result<TaskId, StoreError>;

    /// Sets `completed_at` on an open task. Returns whether a row changed;
    /// unknown and already-completed ids both report `false`.
    fn update_completion(&self, id: TaskId, at: OffsetDateTime) -> Result<bool, StoreError>;

    /// Open tasks in insertion order.
    fn select_open(&self) -> Result<Vec<Task>, StoreError>;
}

pub(crate) fn next_task_id(tasks: &[Task]) -> Result<TaskId, StoreError> {
    tasks
        .iter()
        .map(|task| task.id.get())
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .map(TaskId)
        .ok_or_else(|| StoreError::Rejected("task id space exhausted".into()))
}

pub(crate) fn mark_completed(tasks: &mut [Task], id: TaskId, at: OffsetDateTime) -> bool {
    match tasks.iter_mut().find(|task| task.id == id) {
        Some(task) if task.completed_at.is_none() => {
            task.completed_at = Some(at);
            true
        }
        _ => false,
    }
}
