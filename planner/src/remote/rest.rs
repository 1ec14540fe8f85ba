//! JSON-over-HTTP remote store.
//!
//! [`RestRemote`] turns each operation into a [`Route`] plus an optional JSON
//! body, hands the request to an [`HttpClient`], checks the status, and
//! schema-validates the response through [`planner_proto::codec`]. The HTTP
//! client itself is injected so the transport can be swapped or stubbed.

use std::future::Future;

use serde::de::DeserializeOwned;
use url::Url;

use planner_proto::codec;
use planner_proto::order::{MoveListBody, MoveTaskBody, OrderEntry, Position};
use planner_proto::route::{Method, Route};
use planner_proto::task::{
    Completion, ListName, NewTask, Task, TaskEdit, TaskId, TaskList, TaskListId,
};

use super::{RemoteError, RemoteStore};

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// JSON body, if any.
    pub body: Option<String>,
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in the `2xx` range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Minimal async HTTP client used by [`RestRemote`].
///
/// Implementations return `Err` only for transport failures; any status the
/// server sent comes back as an [`HttpResponse`].
pub trait HttpClient: Send + Sync + 'static {
    /// Sends `request` and waits for the full response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, RemoteError>> + Send;
}

/// Remote store speaking the planner REST API.
pub struct RestRemote<H> {
    base: Url,
    http: H,
}

impl<H: HttpClient> RestRemote<H> {
    /// Creates a store rooted at `base`.
    pub const fn new(base: Url, http: H) -> Self {
        Self { base, http }
    }

    /// Returns the API base URL.
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    async fn call(&self, route: Route, body: Option<String>) -> Result<String, RemoteError> {
        let request = HttpRequest {
            method: route.method(),
            url: route.url(&self.base)?,
            body,
        };
        tracing::debug!(%route, "sending request");
        let response = self.http.send(request).await?;
        if !response.is_success() {
            tracing::debug!(%route, status = response.status, "request rejected");
            return Err(RemoteError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response.body)
    }

    async fn fetch<T: DeserializeOwned>(&self, route: Route) -> Result<T, RemoteError> {
        let body = self.call(route, None).await?;
        Ok(codec::decode(&body)?)
    }

    async fn send_json<B: serde::Serialize + Sync>(
        &self,
        route: Route,
        body: &B,
    ) -> Result<String, RemoteError> {
        let body = codec::encode(body)?;
        self.call(route, Some(body)).await
    }
}

impl<H: HttpClient> RemoteStore for RestRemote<H> {
    async fn list_task_lists(&self) -> Result<Vec<TaskList>, RemoteError> {
        self.fetch(Route::ListTaskLists).await
    }

    async fn task_list_order(&self) -> Result<Vec<OrderEntry<TaskListId>>, RemoteError> {
        self.fetch(Route::TaskListOrder).await
    }

    async fn create_task_list(&self, name: &str) -> Result<TaskList, RemoteError> {
        let body = ListName {
            name: name.to_string(),
        };
        let text = self.send_json(Route::CreateTaskList, &body).await?;
        Ok(codec::decode(&text)?)
    }

    async fn rename_task_list(&self, id: TaskListId, name: &str) -> Result<(), RemoteError> {
        let body = ListName {
            name: name.to_string(),
        };
        self.send_json(Route::RenameTaskList(id), &body).await?;
        Ok(())
    }

    async fn delete_task_list(&self, id: TaskListId) -> Result<(), RemoteError> {
        self.call(Route::DeleteTaskList(id), None).await?;
        Ok(())
    }

    async fn move_task_list(
        &self,
        id: TaskListId,
        target: TaskListId,
        position: Position,
    ) -> Result<(), RemoteError> {
        let body = MoveListBody {
            target_id: target,
            position,
        };
        self.send_json(Route::MoveTaskList(id), &body).await?;
        Ok(())
    }

    async fn list_tasks(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> Result<Vec<Task>, RemoteError> {
        self.fetch(Route::ListTasks { list, completion }).await
    }

    async fn task_order(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> Result<Vec<OrderEntry<TaskId>>, RemoteError> {
        self.fetch(Route::TaskOrder { list, completion }).await
    }

    async fn create_task(&self, list: TaskListId, task: NewTask) -> Result<Task, RemoteError> {
        let text = self.send_json(Route::CreateTask(list), &task).await?;
        Ok(codec::decode(&text)?)
    }

    async fn update_task(
        &self,
        list: TaskListId,
        id: TaskId,
        edit: TaskEdit,
    ) -> Result<(), RemoteError> {
        self.send_json(Route::UpdateTask { list, task: id }, &edit)
            .await?;
        Ok(())
    }

    async fn delete_task(&self, list: TaskListId, id: TaskId) -> Result<(), RemoteError> {
        self.call(Route::DeleteTask { list, task: id }, None).await?;
        Ok(())
    }

    async fn toggle_completion(&self, list: TaskListId, id: TaskId) -> Result<(), RemoteError> {
        self.call(Route::ToggleCompletion { list, task: id }, None)
            .await?;
        Ok(())
    }

    async fn move_task(
        &self,
        list: TaskListId,
        id: TaskId,
        target: TaskId,
        position: Position,
    ) -> Result<(), RemoteError> {
        let body = MoveTaskBody {
            target_task_id: target,
            pos: position,
        };
        self.send_json(Route::MoveTask { list, task: id }, &body)
            .await?;
        Ok(())
    }

    async fn clear_completed(&self, list: TaskListId) -> Result<(), RemoteError> {
        self.call(Route::ClearCompleted(list), None).await?;
        Ok(())
    }
}
