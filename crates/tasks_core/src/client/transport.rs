use crate::error::AppError;
use crate::router::Router;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// One request/response round-trip to a router.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, path: &str, input: Value) -> Result<Value, AppError>;
}

/// Calls a router living in the same process, optionally after a fixed delay
/// standing in for network latency.
pub struct LocalTransport {
    router: Arc<Router>,
    latency: Duration,
}

impl LocalTransport {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, path: &str, input: Value) -> Result<Value, AppError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.router.dispatch(path, input)
    }
}
