use crate::error::AppError;
use crate::model::{TaskId, TaskSummary};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    Loading,
    Ready,
}

/// Issued when a list fetch starts; a response is applied only if its ticket
/// is newer than the last applied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PendingCompletion {
    in_flight: u32,
    confirmed: bool,
}

/// Client-side picture of the open-task list: the last server snapshot plus
/// the ids the user has completed locally.
#[derive(Debug, Default)]
pub struct TaskListView {
    snapshot: Option<Vec<TaskSummary>>,
    pending: BTreeMap<TaskId, PendingCompletion>,
    issued: u64,
    applied: u64,
    settled: u64,
    last_fetch_error: Option<AppError>,
}

impl TaskListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ListPhase {
        if self.snapshot.is_some() {
            ListPhase::Ready
        } else {
            ListPhase::Loading
        }
    }

    /// A fetch newer than every settled one is outstanding while a snapshot
    /// is already on screen.
    pub fn is_refreshing(&self) -> bool {
        self.snapshot.is_some() && self.issued > self.settled
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Replaces the snapshot unless a newer response already landed. Pending
    /// ids missing from the new snapshot are confirmed and dropped.
    pub fn apply_snapshot(&mut self, ticket: FetchTicket, tasks: Vec<TaskSummary>) -> bool {
        self.settled = self.settled.max(ticket.0);
        if ticket.0 <= self.applied {
            tracing::debug!(
                ticket = ticket.0,
                applied = self.applied,
                "discarding stale list response"
            );
            return false;
        }

        self.applied = ticket.0;
        let present: HashSet<TaskId> = tasks.iter().map(|task| task.id).collect();
        self.pending.retain(|id, _| present.contains(id));
        self.snapshot = Some(tasks);
        self.last_fetch_error = None;
        true
    }

    pub fn apply_fetch_error(&mut self, ticket: FetchTicket, err: AppError) {
        self.settled = self.settled.max(ticket.0);
        if ticket.0 > self.applied {
            self.last_fetch_error = Some(err);
        }
    }

    pub fn begin_completion(&mut self, id: TaskId) {
        self.pending.entry(id).or_default().in_flight += 1;
    }

    pub fn completion_succeeded(&mut self, id: TaskId) {
        if let Some(entry) = self.pending.get_mut(&id) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
            entry.confirmed = true;
        }
    }

    /// Rolls the optimistic completion back unless another completion of
    /// the same id is still in flight or already succeeded. Returns whether
    /// the id left the overlay.
    pub fn completion_failed(&mut self, id: TaskId) -> bool {
        let Some(entry) = self.pending.get_mut(&id) else {
            return false;
        };
        entry.in_flight = entry.in_flight.saturating_sub(1);
        if entry.in_flight == 0 && !entry.confirmed {
            self.pending.remove(&id);
            return true;
        }
        false
    }

    /// Snapshot as last received from the server.
    pub fn tasks(&self) -> &[TaskSummary] {
        self.snapshot.as_deref().unwrap_or(&[])
    }

    /// Snapshot with locally completed tasks hidden.
    pub fn visible_tasks(&self) -> Vec<TaskSummary> {
        self.tasks()
            .iter()
            .filter(|task| !self.pending.contains_key(&task.id))
            .cloned()
            .collect()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.pending.keys().copied().collect()
    }

    pub fn last_fetch_error(&self) -> Option<&AppError> {
        self.last_fetch_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{ListPhase, TaskListView};
    use crate::error::AppError;
    use crate::model::{TaskId, TaskSummary};

    fn task(id: i64, title: &str) -> TaskSummary {
        TaskSummary {
            id: TaskId(id),
            title: title.to_string(),
            description: String::new(),
        }
    }

    fn ready_view(tasks: Vec<TaskSummary>) -> TaskListView {
        let mut view = TaskListView::new();
        let ticket = view.begin_fetch();
        assert!(view.apply_snapshot(ticket, tasks));
        view
    }

    #[test]
    fn starts_loading_until_first_snapshot() {
        let mut view = TaskListView::new();
        assert_eq!(view.phase(), ListPhase::Loading);

        let ticket = view.begin_fetch();
        assert!(!view.is_refreshing());
        view.apply_snapshot(ticket, vec![task(1, "a")]);

        assert_eq!(view.phase(), ListPhase::Ready);
        assert!(view.pending_ids().is_empty());
    }

    #[test]
    fn completion_hides_task_immediately() {
        let mut view = ready_view(vec![task(1, "a"), task(2, "b")]);

        view.begin_completion(TaskId(1));

        assert_eq!(view.visible_tasks(), vec![task(2, "b")]);
        assert_eq!(view.tasks().len(), 2);
    }

    #[test]
    fn refetch_prunes_confirmed_ids() {
        let mut view = ready_view(vec![task(1, "a"), task(2, "b")]);
        view.begin_completion(TaskId(1));
        view.completion_succeeded(TaskId(1));

        let ticket = view.begin_fetch();
        assert!(view.is_refreshing());
        view.apply_snapshot(ticket, vec![task(2, "b")]);

        assert!(!view.is_refreshing());
        assert!(view.pending_ids().is_empty());
        assert_eq!(view.visible_tasks(), vec![task(2, "b")]);
    }

    #[test]
    fn snapshot_still_listing_id_keeps_it_pending() {
        let mut view = ready_view(vec![task(1, "a")]);
        view.begin_completion(TaskId(1));

        let ticket = view.begin_fetch();
        view.apply_snapshot(ticket, vec![task(1, "a")]);

        assert!(view.is_pending(TaskId(1)));
        assert!(view.visible_tasks().is_empty());
    }

    #[test]
    fn failure_rolls_back_overlay() {
        let mut view = ready_view(vec![task(1, "a")]);
        view.begin_completion(TaskId(1));

        assert!(view.completion_failed(TaskId(1)));
        assert_eq!(view.visible_tasks(), vec![task(1, "a")]);
    }

    #[test]
    fn failure_keeps_overlay_when_duplicate_succeeded() {
        let mut view = ready_view(vec![task(1, "a")]);
        view.begin_completion(TaskId(1));
        view.begin_completion(TaskId(1));

        view.completion_succeeded(TaskId(1));
        assert!(!view.completion_failed(TaskId(1)));
        assert!(view.is_pending(TaskId(1)));
    }

    #[test]
    fn failure_waits_for_other_in_flight_duplicate() {
        let mut view = ready_view(vec![task(1, "a")]);
        view.begin_completion(TaskId(1));
        view.begin_completion(TaskId(1));

        assert!(!view.completion_failed(TaskId(1)));
        assert!(view.is_pending(TaskId(1)));
        assert!(view.completion_failed(TaskId(1)));
        assert!(!view.is_pending(TaskId(1)));
    }

    #[test]
    fn older_response_arriving_late_is_discarded() {
        let mut view = ready_view(vec![task(1, "a"), task(2, "b")]);
        let older = view.begin_fetch();
        let newer = view.begin_fetch();

        assert!(view.apply_snapshot(newer, vec![task(2, "b")]));
        assert!(!view.apply_snapshot(older, vec![task(1, "a"), task(2, "b")]));

        assert_eq!(view.tasks(), &[task(2, "b")]);
        assert!(!view.is_refreshing());
    }

    #[test]
    fn fetch_error_keeps_previous_snapshot() {
        let mut view = ready_view(vec![task(1, "a")]);
        let ticket = view.begin_fetch();

        view.apply_fetch_error(ticket, AppError::store("database is locked"));

        assert_eq!(view.tasks(), &[task(1, "a")]);
        assert_eq!(
            view.last_fetch_error().map(AppError::code),
            Some("store_error")
        );
        assert!(!view.is_refreshing());
    }
}
