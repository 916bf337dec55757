//! Declarations of the remote operations.
//!
//! Every operation is a zero-sized type implementing [`Procedure`]. The
//! associated `Input`/`Output` types fix the wire shape, and the
//! [`Query`]/[`Mutation`] markers decide how a client is allowed to call it.

use crate::error::AppError;
use crate::model::{NewTask, TaskId, TaskSummary};
use crate::router::Router;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

pub trait Procedure: Send + Sync + 'static {
    const PATH: &'static str;
    const KIND: ProcedureKind;

    type Input: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    fn handle(router: &Router, input: Self::Input) -> Result<Self::Output, AppError>;
}

/// Side-effect free procedures; safe to retry and to coalesce.
pub trait Query: Procedure {}

/// Procedures that change store state; never coalesced.
pub trait Mutation: Procedure {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: String,
}

impl CreateTaskInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    pub(crate) fn validate(self) -> Result<NewTask, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title is required"));
        }
        Ok(NewTask {
            title: self.title,
            description: self.description,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteTaskInput {
    pub id: TaskId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTasksInput {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTasksOutput {
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateTask;

impl Procedure for CreateTask {
    const PATH: &'static str = "tasks.create";
    const KIND: ProcedureKind = ProcedureKind::Mutation;

    type Input = CreateTaskInput;
    type Output = ();

    fn handle(router: &Router, input: CreateTaskInput) -> Result<(), AppError> {
        router.create(input)
    }
}

impl Mutation for CreateTask {}

#[derive(Debug, Clone, Copy)]
pub struct CompleteTask;

impl Procedure for CompleteTask {
    const PATH: &'static str = "tasks.complete";
    const KIND: ProcedureKind = ProcedureKind::Mutation;

    type Input = CompleteTaskInput;
    type Output = ();

    fn handle(router: &Router, input: CompleteTaskInput) -> Result<(), AppError> {
        router.complete(input)
    }
}

impl Mutation for CompleteTask {}

#[derive(Debug, Clone, Copy)]
pub struct ListTasks;

impl Procedure for ListTasks {
    const PATH: &'static str = "tasks.list";
    const KIND: ProcedureKind = ProcedureKind::Query;

    type Input = ListTasksInput;
    type Output = ListTasksOutput;

    fn handle(router: &Router, input: ListTasksInput) -> Result<ListTasksOutput, AppError> {
        router.list(input)
    }
}

impl Query for ListTasks {}
