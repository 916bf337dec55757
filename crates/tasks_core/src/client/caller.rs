use crate::client::coalesce::InFlightReads;
use crate::client::state::{CallState, CallTracker};
use crate::client::transport::Transport;
use crate::error::AppError;
use crate::router::procedure::{Mutation, Procedure, Query};
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Typed client stub for the router's procedures.
///
/// Reads go through [`query`](Self::query) and share a round-trip with any
/// identical read already on the wire. Writes go through
/// [`mutate`](Self::mutate) and always get their own round-trip. Neither
/// touches a cache: after a write, the consumer decides which reads to
/// [`invalidate`](Self::invalidate) and refetch.
pub struct ProcedureCaller {
    transport: Arc<dyn Transport>,
    reads: InFlightReads,
}

impl ProcedureCaller {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            reads: InFlightReads::default(),
        }
    }

    pub async fn query<P: Query>(&self, input: &P::Input) -> Result<P::Output, AppError> {
        let encoded = encode_input::<P>(input)?;
        let key = encoded.to_string();
        let transport = Arc::clone(&self.transport);
        let call = self.reads.join_or_start(P::PATH, key, move || {
            async move { transport.send(P::PATH, encoded).await }.boxed()
        });
        decode_output::<P>(call.await?)
    }

    pub async fn mutate<P: Mutation>(&self, input: &P::Input) -> Result<P::Output, AppError> {
        let encoded = encode_input::<P>(input)?;
        let output = self.transport.send(P::PATH, encoded).await?;
        decode_output::<P>(output)
    }

    /// Stops new reads of `P` from joining calls issued before now.
    pub fn invalidate<P: Query>(&self) -> usize {
        let detached = self.reads.invalidate(P::PATH);
        if detached > 0 {
            tracing::trace!(path = P::PATH, detached, "invalidated in-flight reads");
        }
        detached
    }
}

fn encode_input<P: Procedure>(input: &P::Input) -> Result<Value, AppError> {
    serde_json::to_value(input)
        .map_err(|err| AppError::validation(format!("cannot encode input for {}: {err}", P::PATH)))
}

fn decode_output<P: Procedure>(output: Value) -> Result<P::Output, AppError> {
    serde_json::from_value(output).map_err(|err| {
        AppError::invalid_data(format!("unexpected response from {}: {err}", P::PATH))
    })
}

/// A read procedure bound to a caller, publishing the state of its latest
/// fetch.
pub struct TrackedQuery<P: Query> {
    caller: Arc<ProcedureCaller>,
    tracker: CallTracker<P::Output>,
}

impl<P: Query> TrackedQuery<P> {
    pub fn new(caller: Arc<ProcedureCaller>) -> Self {
        Self {
            caller,
            tracker: CallTracker::new(),
        }
    }

    pub async fn fetch(&self, input: &P::Input) -> Result<P::Output, AppError> {
        let seq = self.tracker.begin();
        let result = self.caller.query::<P>(input).await;
        self.tracker.settle(seq, &result);
        result
    }

    pub fn invalidate(&self) -> usize {
        self.caller.invalidate::<P>()
    }

    pub fn state(&self) -> CallState<P::Output> {
        self.tracker.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState<P::Output>> {
        self.tracker.subscribe()
    }
}

/// A write procedure bound to a caller, publishing the state of its latest
/// run.
pub struct TrackedMutation<P: Mutation> {
    caller: Arc<ProcedureCaller>,
    tracker: CallTracker<P::Output>,
}

impl<P: Mutation> TrackedMutation<P> {
    pub fn new(caller: Arc<ProcedureCaller>) -> Self {
        Self {
            caller,
            tracker: CallTracker::new(),
        }
    }

    pub async fn run(&self, input: &P::Input) -> Result<P::Output, AppError> {
        let seq = self.tracker.begin();
        let result = self.caller.mutate::<P>(input).await;
        self.tracker.settle(seq, &result);
        result
    }

    pub fn state(&self) -> CallState<P::Output> {
        self.tracker.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState<P::Output>> {
        self.tracker.subscribe()
    }
}
