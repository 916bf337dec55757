use crate::model::{NewTask, Task, TaskId};
use crate::storage::{StoreError, StoreOp, TaskStore, mark_completed, next_task_id};
use parking_lot::Mutex;
use std::collections::HashMap;
use time::OffsetDateTime;

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    failures: HashMap<StoreOp, String>,
}

/// In-process store. Every call holds the lock for its whole duration, which
/// gives single-row atomicity.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                tasks,
                failures: HashMap::new(),
            }),
        }
    }

    /// Makes the next call of `op` fail with `message`.
    pub fn fail_next<M: Into<String>>(&self, op: StoreOp, message: M) {
        self.state.lock().failures.insert(op, message.into());
    }

    /// Every stored record, completed ones included.
    pub fn snapshot(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    fn take_failure(state: &mut MemoryState, op: StoreOp) -> Result<(), StoreError> {
        match state.failures.remove(&op) {
            Some(message) => Err(StoreError::Rejected(message)),
            None => Ok(()),
        }
    }
}

impl TaskStore for MemoryStore {
    fn insert(&self, task: NewTask) -> Result<TaskId, StoreError> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state, StoreOp::Insert)?;

        let id = next_task_id(&state.tasks)?;
        state.tasks.push(Task {
            id,
            title: task.title,
            description: task.description,
            completed_at: None,
        });
        Ok(id)
    }

    fn update_completion(&self, id: TaskId, at: OffsetDateTime) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state, StoreOp::UpdateCompletion)?;
        Ok(mark_completed(&mut state.tasks, id, at))
    }

    fn select_open(&self) -> Result<Vec<Task>, StoreError> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state, StoreOp::SelectOpen)?;
        Ok(state
            .tasks
            .iter()
            .filter(|task| task.is_open())
            .cloned()
            .collect())
    }
}
