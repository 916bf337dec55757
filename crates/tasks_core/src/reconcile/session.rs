use crate::client::{CallState, ProcedureCaller, TrackedMutation, TrackedQuery};
use crate::error::AppError;
use crate::model::{TaskId, TaskSummary};
use crate::notify::{Notice, NoticeBoard, NoticeKey, NoticeLevel};
use crate::reconcile::view::{ListPhase, TaskListView};
use crate::router::procedure::{
    CompleteTask, CompleteTaskInput, CreateTask, CreateTaskInput, ListTasks, ListTasksInput,
    ListTasksOutput,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub const CREATED_NOTICE: &str = "Create successfully!";
pub const COMPLETED_NOTICE: &str = "Task completed";

/// One client's view of the task list, kept responsive with optimistic
/// completions and reconciled against the server after every mutation.
///
/// Locks on the view and notice board are never held across an await.
pub struct TaskSession {
    list: TrackedQuery<ListTasks>,
    create: TrackedMutation<CreateTask>,
    complete: TrackedMutation<CompleteTask>,
    view: Mutex<TaskListView>,
    notices: Mutex<NoticeBoard>,
}

impl TaskSession {
    pub fn new(caller: Arc<ProcedureCaller>, notices: NoticeBoard) -> Self {
        Self {
            list: TrackedQuery::new(Arc::clone(&caller)),
            create: TrackedMutation::new(Arc::clone(&caller)),
            complete: TrackedMutation::new(caller),
            view: Mutex::new(TaskListView::new()),
            notices: Mutex::new(notices),
        }
    }

    pub async fn refresh(&self) -> Result<(), AppError> {
        let ticket = self.view.lock().begin_fetch();
        match self.list.fetch(&ListTasksInput::default()).await {
            Ok(output) => {
                self.view.lock().apply_snapshot(ticket, output.tasks);
                Ok(())
            }
            Err(err) => {
                self.view.lock().apply_fetch_error(ticket, err.clone());
                Err(err)
            }
        }
    }

    pub async fn create_task(&self, input: CreateTaskInput) -> Result<(), AppError> {
        match self.create.run(&input).await {
            Ok(()) => {
                self.notices
                    .lock()
                    .push(CREATED_NOTICE, NoticeLevel::Success);
                self.refetch_after_mutation().await;
                Ok(())
            }
            Err(err) => {
                self.notices.lock().push(
                    format!("Create failed: {}", err.message()),
                    NoticeLevel::Error,
                );
                Err(err)
            }
        }
    }

    /// Hides `id` right away, then asks the server to complete it. On failure
    /// the task comes back and an error notice is raised.
    pub async fn complete_task(&self, id: TaskId) -> Result<(), AppError> {
        self.view.lock().begin_completion(id);
        match self.complete.run(&CompleteTaskInput { id }).await {
            Ok(()) => {
                self.view.lock().completion_succeeded(id);
                self.notices
                    .lock()
                    .push(COMPLETED_NOTICE, NoticeLevel::Success);
                self.refetch_after_mutation().await;
                Ok(())
            }
            Err(err) => {
                if self.view.lock().completion_failed(id) {
                    tracing::warn!(%id, error = %err, "rolled back optimistic completion");
                }
                self.notices.lock().push(
                    format!("Could not complete task {id}: {}", err.message()),
                    NoticeLevel::Error,
                );
                Err(err)
            }
        }
    }

    async fn refetch_after_mutation(&self) {
        self.list.invalidate();
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "refetch after mutation failed");
        }
    }

    pub fn visible_tasks(&self) -> Vec<TaskSummary> {
        self.view.lock().visible_tasks()
    }

    pub fn phase(&self) -> ListPhase {
        self.view.lock().phase()
    }

    pub fn is_refreshing(&self) -> bool {
        self.view.lock().is_refreshing()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.view.lock().is_pending(id)
    }

    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.view.lock().pending_ids()
    }

    pub fn last_fetch_error(&self) -> Option<AppError> {
        self.view.lock().last_fetch_error().cloned()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().active()
    }

    pub fn dismiss_notice(&self, key: NoticeKey) -> bool {
        self.notices.lock().dismiss(key)
    }

    pub fn list_state(&self) -> CallState<ListTasksOutput> {
        self.list.state()
    }

    pub fn create_state(&self) -> CallState<()> {
        self.create.state()
    }

    pub fn complete_state(&self) -> CallState<()> {
        self.complete.state()
    }
}
