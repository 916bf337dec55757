use crate::error::AppError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) type SharedRead = Shared<BoxFuture<'static, Result<Value, AppError>>>;

type ReadKey = (&'static str, String);

struct InFlight {
    generation: u64,
    call: SharedRead,
}

/// Reads that are currently on the wire, keyed by procedure path and encoded
/// input. An entry lives only until its response arrives.
#[derive(Default)]
pub(crate) struct InFlightReads {
    entries: Arc<Mutex<HashMap<ReadKey, InFlight>>>,
    next_generation: AtomicU64,
}

impl InFlightReads {
    /// Returns the in-flight call for `(path, input)`, or starts one with
    /// `start` when none is outstanding.
    pub(crate) fn join_or_start<F>(&self, path: &'static str, input: String, start: F) -> SharedRead
    where
        F: FnOnce() -> BoxFuture<'static, Result<Value, AppError>>,
    {
        let key = (path, input);
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            tracing::trace!(path, "joining in-flight read");
            return existing.call.clone();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.entries);
        let cleanup_key = key.clone();
        let inner = start();
        let call = async move {
            let result = inner.await;
            let mut entries = registry.lock();
            if entries
                .get(&cleanup_key)
                .is_some_and(|entry| entry.generation == generation)
            {
                entries.remove(&cleanup_key);
            }
            result
        }
        .boxed()
        .shared();

        entries.insert(
            key,
            InFlight {
                generation,
                call: call.clone(),
            },
        );
        call
    }

    /// Detaches every in-flight read of `path`. Existing waiters still get
    /// their response; new reads start a fresh round-trip.
    pub(crate) fn invalidate(&self, path: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_path, _), _| *entry_path != path);
        before - entries.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
