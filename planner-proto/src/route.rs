//! REST route table for the planner task store.
//!
//! Every remote operation maps to exactly one [`Route`], which knows its
//! HTTP method and path. Bodies are the serde types in [`crate::task`] and
//! [`crate::order`].

use url::Url;

use crate::task::{Completion, TaskId, TaskListId};

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// One operation of the task store API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `GET /taskLists`
    ListTaskLists,
    /// `GET /taskLists/order`
    TaskListOrder,
    /// `PUT /taskLists`
    CreateTaskList,
    /// `PATCH /taskLists/{id}`
    RenameTaskList(TaskListId),
    /// `DELETE /taskLists/{id}`
    DeleteTaskList(TaskListId),
    /// `PATCH /taskLists/move/{id}`
    MoveTaskList(TaskListId),
    /// `GET /{listId}/tasks/{incomplete|complete}`
    ListTasks {
        /// Owning list.
        list: TaskListId,
        /// Which partition to fetch.
        completion: Completion,
    },
    /// `GET /{listId}/tasks/{incomplete|complete}/order`
    TaskOrder {
        /// Owning list.
        list: TaskListId,
        /// Which partition to fetch.
        completion: Completion,
    },
    /// `POST /{listId}/tasks`
    CreateTask(TaskListId),
    /// `PATCH /{listId}/tasks/{taskId}`
    UpdateTask {
        /// Owning list.
        list: TaskListId,
        /// Target task.
        task: TaskId,
    },
    /// `DELETE /{listId}/tasks/{taskId}`
    DeleteTask {
        /// Owning list.
        list: TaskListId,
        /// Target task.
        task: TaskId,
    },
    /// `PATCH /{listId}/tasks/{taskId}/toggle-completion`
    ToggleCompletion {
        /// Owning list.
        list: TaskListId,
        /// Target task.
        task: TaskId,
    },
    /// `PATCH /{listId}/tasks/move/{taskId}`
    MoveTask {
        /// Owning list.
        list: TaskListId,
        /// Moved task.
        task: TaskId,
    },
    /// `DELETE /{listId}/clear`
    ClearCompleted(TaskListId),
}

impl Route {
    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::ListTaskLists
            | Self::TaskListOrder
            | Self::ListTasks { .. }
            | Self::TaskOrder { .. } => Method::Get,
            Self::CreateTaskList => Method::Put,
            Self::CreateTask(_) => Method::Post,
            Self::RenameTaskList(_)
            | Self::MoveTaskList(_)
            | Self::UpdateTask { .. }
            | Self::ToggleCompletion { .. }
            | Self::MoveTask { .. } => Method::Patch,
            Self::DeleteTaskList(_) | Self::DeleteTask { .. } | Self::ClearCompleted(_) => {
                Method::Delete
            }
        }
    }

    /// Returns the absolute path, starting with `/`.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::ListTaskLists | Self::CreateTaskList => "/taskLists".to_string(),
            Self::TaskListOrder => "/taskLists/order".to_string(),
            Self::RenameTaskList(id) | Self::DeleteTaskList(id) => format!("/taskLists/{id}"),
            Self::MoveTaskList(id) => format!("/taskLists/move/{id}"),
            Self::ListTasks { list, completion } => format!("/{list}/tasks/{completion}"),
            Self::TaskOrder { list, completion } => format!("/{list}/tasks/{completion}/order"),
            Self::CreateTask(list) => format!("/{list}/tasks"),
            Self::UpdateTask { list, task } | Self::DeleteTask { list, task } => {
                format!("/{list}/tasks/{task}")
            }
            Self::ToggleCompletion { list, task } => {
                format!("/{list}/tasks/{task}/toggle-completion")
            }
            Self::MoveTask { list, task } => format!("/{list}/tasks/move/{task}"),
            Self::ClearCompleted(list) => format!("/{list}/clear"),
        }
    }

    /// Resolves the route against an API base URL.
    ///
    /// The base may or may not end with `/`; its path is kept as a prefix.
    ///
    /// # Errors
    ///
    /// Returns a [`url::ParseError`] if the joined URL is invalid.
    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        base.join(self.path().trim_start_matches('/'))
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}
