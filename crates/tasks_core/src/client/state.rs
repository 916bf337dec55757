use crate::error::AppError;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Lifecycle of the most recent call made through a tracked handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState<T> {
    Idle,
    Pending,
    Success(T),
    Error(AppError),
}

impl<T> CallState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

/// Publishes [`CallState`] changes. Only the latest call may settle the
/// state; an older call finishing late is ignored.
pub(crate) struct CallTracker<T> {
    state: watch::Sender<CallState<T>>,
    latest: AtomicU64,
}

impl<T: Clone> CallTracker<T> {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(CallState::Idle);
        Self {
            state,
            latest: AtomicU64::new(0),
        }
    }

    pub(crate) fn begin(&self) -> u64 {
        let mut seq = 0;
        self.state.send_modify(|state| {
            seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            *state = CallState::Pending;
        });
        seq
    }

    pub(crate) fn settle(&self, seq: u64, result: &Result<T, AppError>) {
        self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != seq {
                return false;
            }
            *state = match result {
                Ok(value) => CallState::Success(value.clone()),
                Err(err) => CallState::Error(err.clone()),
            };
            true
        });
    }

    pub(crate) fn snapshot(&self) -> CallState<T> {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<CallState<T>> {
        self.state.subscribe()
    }
}
