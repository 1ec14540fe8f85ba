//! Remote task store abstraction.
//!
//! Defines the [`RemoteStore`] trait the optimistic mutation engine talks to.
//! Concrete implementations:
//! - [`memory::InMemoryRemote`]: in-process server model for tests and the demo
//! - [`gated::GatedRemote`]: wraps another store and holds every request until
//!   the caller releases it, to drive out-of-order settlement in tests
//! - [`rest::RestRemote`]: maps each operation onto the JSON/HTTP route table,
//!   sent over [`http::UreqClient`] in production

pub mod gated;
pub mod http;
pub mod memory;
pub mod rest;

use std::future::Future;

use planner_proto::codec::CodecError;
use planner_proto::order::{OrderEntry, Position};
use planner_proto::task::{Completion, NewTask, Task, TaskEdit, TaskId, TaskList, TaskListId};

/// Errors returned by a remote store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never reached the server or the connection dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Schema(#[from] CodecError),

    /// No response arrived within the configured request timeout.
    #[error("request timed out")]
    Timeout,

    /// A request URL could not be built from the configured base.
    #[error("invalid request url: {0}")]
    Url(String),
}

impl RemoteError {
    /// Shorthand for a `404 Not Found` status.
    #[must_use]
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::Status {
            status: 404,
            body: format!("{what} not found"),
        }
    }
}

impl From<url::ParseError> for RemoteError {
    fn from(err: url::ParseError) -> Self {
        Self::Url(err.to_string())
    }
}

/// Async interface to the server-side task store.
///
/// One method per API operation. Every mutation issued by the engine results
/// in exactly one call here. Implementations must be safe to share across
/// tasks: the engine holds them in an `Arc` and calls them from spawned
/// futures.
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetches every task list.
    fn list_task_lists(&self) -> impl Future<Output = Result<Vec<TaskList>, RemoteError>> + Send;

    /// Fetches the order of task lists.
    fn task_list_order(
        &self,
    ) -> impl Future<Output = Result<Vec<OrderEntry<TaskListId>>, RemoteError>> + Send;

    /// Creates a list and returns it with its server-assigned id.
    fn create_task_list(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<TaskList, RemoteError>> + Send;

    /// Renames a list.
    fn rename_task_list(
        &self,
        id: TaskListId,
        name: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Deletes a list and everything in it.
    fn delete_task_list(
        &self,
        id: TaskListId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Moves a list before or after another.
    fn move_task_list(
        &self,
        id: TaskListId,
        target: TaskListId,
        position: Position,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Fetches one completion partition of a list.
    fn list_tasks(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> impl Future<Output = Result<Vec<Task>, RemoteError>> + Send;

    /// Fetches the order of one completion partition.
    fn task_order(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> impl Future<Output = Result<Vec<OrderEntry<TaskId>>, RemoteError>> + Send;

    /// Creates a task and returns the server's canonical copy.
    fn create_task(
        &self,
        list: TaskListId,
        task: NewTask,
    ) -> impl Future<Output = Result<Task, RemoteError>> + Send;

    /// Replaces a task's label and due date.
    fn update_task(
        &self,
        list: TaskListId,
        id: TaskId,
        edit: TaskEdit,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Deletes a task.
    fn delete_task(
        &self,
        list: TaskListId,
        id: TaskId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Flips a task's completion flag, moving it to the end of the other
    /// partition.
    fn toggle_completion(
        &self,
        list: TaskListId,
        id: TaskId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Moves a task before or after another task in the same partition.
    fn move_task(
        &self,
        list: TaskListId,
        id: TaskId,
        target: TaskId,
        position: Position,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Deletes every completed task in a list.
    fn clear_completed(
        &self,
        list: TaskListId,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
