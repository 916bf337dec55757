//! Server-side entry point for the `tasks.*` procedures.
//!
//! The router owns no state of its own: every call validates its input and
//! goes straight to the injected [`TaskStore`]. Calls are synchronous and run
//! to completion; atomicity is whatever the store gives a single operation.

pub mod procedure;

use crate::clock::Clock;
use crate::error::AppError;
use crate::router::procedure::{
    CompleteTask, CompleteTaskInput, CreateTask, CreateTaskInput, ListTasks, ListTasksInput,
    ListTasksOutput, Procedure,
};
use crate::storage::TaskStore;
use serde_json::Value;
use std::sync::Arc;

pub struct Router {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl Router {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn create(&self, input: CreateTaskInput) -> Result<(), AppError> {
        let task = input.validate()?;
        let id = self.store.insert(task).map_err(|err| {
            tracing::warn!(error = %err, "insert failed");
            AppError::from(err)
        })?;
        tracing::debug!(%id, "task created");
        Ok(())
    }

    /// Completing an unknown or already-completed id changes nothing and is
    /// not an error.
    pub fn complete(&self, input: CompleteTaskInput) -> Result<(), AppError> {
        let at = self.clock.now();
        let changed = self
            .store
            .update_completion(input.id, at)
            .map_err(|err| {
                tracing::warn!(id = %input.id, error = %err, "completion update failed");
                AppError::from(err)
            })?;
        if changed {
            tracing::debug!(id = %input.id, "task completed");
        } else {
            tracing::debug!(id = %input.id, "completion affected no rows");
        }
        Ok(())
    }

    pub fn list(&self, _input: ListTasksInput) -> Result<ListTasksOutput, AppError> {
        let tasks = self.store.select_open().map_err(|err| {
            tracing::warn!(error = %err, "select failed");
            AppError::from(err)
        })?;
        Ok(ListTasksOutput {
            tasks: tasks.into_iter().map(Into::into).collect(),
        })
    }

    /// Typed entry point; the input shape is checked by the compiler.
    pub fn call<P: Procedure>(&self, input: P::Input) -> Result<P::Output, AppError> {
        P::handle(self, input)
    }

    /// Untyped entry point used by transports: decodes `input` against the
    /// schema of the procedure named by `path`.
    pub fn dispatch(&self, path: &str, input: Value) -> Result<Value, AppError> {
        tracing::debug!(path, "dispatch");
        match path {
            p if p == CreateTask::PATH => self.dispatch_as::<CreateTask>(input),
            p if p == CompleteTask::PATH => self.dispatch_as::<CompleteTask>(input),
            p if p == ListTasks::PATH => self.dispatch_as::<ListTasks>(input),
            other => Err(AppError::not_found(format!("unknown procedure '{other}'"))),
        }
    }

    fn dispatch_as<P: Procedure>(&self, input: Value) -> Result<Value, AppError> {
        let input = match input {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let input: P::Input = serde_json::from_value(input)
            .map_err(|err| AppError::validation(format!("invalid input for {}: {err}", P::PATH)))?;
        let output = self.call::<P>(input)?;
        serde_json::to_value(output).map_err(|err| AppError::invalid_data(err.to_string()))
    }
}
