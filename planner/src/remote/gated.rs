//! Remote store wrapper that holds requests until released.
//!
//! [`GatedRemote`] parks every request at a gate. The caller decides, per
//! request, whether it proceeds to the wrapped store or fails, and in which
//! order. This makes out-of-order settlement of overlapping mutations
//! reproducible in tests and in the demo.

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};

use planner_proto::order::{OrderEntry, Position};
use planner_proto::route::Route;
use planner_proto::task::{Completion, NewTask, Task, TaskEdit, TaskId, TaskList, TaskListId};

use super::{RemoteError, RemoteStore};

enum Decision {
    Release,
    Fail(RemoteError),
}

struct Gate {
    route: Route,
    decision: Option<oneshot::Sender<Decision>>,
}

/// Wraps a [`RemoteStore`] and parks each request until released.
pub struct GatedRemote<R> {
    inner: R,
    gates: Mutex<Vec<Gate>>,
    arrived: Notify,
}

impl<R: RemoteStore> GatedRemote<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            gates: Mutex::new(Vec::new()),
            arrived: Notify::new(),
        }
    }

    /// Returns the wrapped store.
    pub const fn inner(&self) -> &R {
        &self.inner
    }

    /// Requests that arrived and are still parked, with their arrival index.
    pub fn pending(&self) -> Vec<(usize, Route)> {
        self.gates
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, g)| g.decision.is_some())
            .map(|(i, g)| (i, g.route))
            .collect()
    }

    /// Total number of requests that have arrived, parked or not.
    pub fn arrived(&self) -> usize {
        self.gates.lock().len()
    }

    /// Waits until at least `count` requests have arrived.
    pub async fn wait_for_arrivals(&self, count: usize) {
        loop {
            let notified = self.arrived.notified();
            if self.arrived() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Lets request `index` proceed to the wrapped store.
    ///
    /// Returns `false` if there is no parked request with that index.
    pub fn release(&self, index: usize) -> bool {
        self.decide(index, Decision::Release)
    }

    /// Fails request `index` with `error` without forwarding it.
    ///
    /// Returns `false` if there is no parked request with that index.
    pub fn fail(&self, index: usize, error: RemoteError) -> bool {
        self.decide(index, Decision::Fail(error))
    }

    /// Releases every parked request in arrival order.
    pub fn release_all(&self) {
        let count = self.arrived();
        for index in 0..count {
            self.release(index);
        }
    }

    fn decide(&self, index: usize, decision: Decision) -> bool {
        let sender = self
            .gates
            .lock()
            .get_mut(index)
            .and_then(|g| g.decision.take());
        sender.is_some_and(|tx| tx.send(decision).is_ok())
    }

    async fn hold(&self, route: Route) -> Result<(), RemoteError> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push(Gate {
            route,
            decision: Some(tx),
        });
        self.arrived.notify_waiters();
        tracing::trace!(%route, "request parked");
        match rx.await {
            Ok(Decision::Release) => Ok(()),
            Ok(Decision::Fail(err)) => Err(err),
            Err(_) => Err(RemoteError::Transport("gate closed".to_string())),
        }
    }
}

impl<R: RemoteStore> RemoteStore for GatedRemote<R> {
    async fn list_task_lists(&self) -> Result<Vec<TaskList>, RemoteError> {
        self.hold(Route::ListTaskLists).await?;
        self.inner.list_task_lists().await
    }

    async fn task_list_order(&self) -> Result<Vec<OrderEntry<TaskListId>>, RemoteError> {
        self.hold(Route::TaskListOrder).await?;
        self.inner.task_list_order().await
    }

    async fn create_task_list(&self, name: &str) -> Result<TaskList, RemoteError> {
        self.hold(Route::CreateTaskList).await?;
        self.inner.create_task_list(name).await
    }

    async fn rename_task_list(&self, id: TaskListId, name: &str) -> Result<(), RemoteError> {
        self.hold(Route::RenameTaskList(id)).await?;
        self.inner.rename_task_list(id, name).await
    }

    async fn delete_task_list(&self, id: TaskListId) -> Result<(), RemoteError> {
        self.hold(Route::DeleteTaskList(id)).await?;
        self.inner.delete_task_list(id).await
    }

    async fn move_task_list(
        &self,
        id: TaskListId,
        target: TaskListId,
        position: Position,
    ) -> Result<(), RemoteError> {
        self.hold(Route::MoveTaskList(id)).await?;
        self.inner.move_task_list(id, target, position).await
    }

    async fn list_tasks(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> Result<Vec<Task>, RemoteError> {
        self.hold(Route::ListTasks { list, completion }).await?;
        self.inner.list_tasks(list, completion).await
    }

    async fn task_order(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> Result<Vec<OrderEntry<TaskId>>, RemoteError> {
        self.hold(Route::TaskOrder { list, completion }).await?;
        self.inner.task_order(list, completion).await
    }

    async fn create_task(&self, list: TaskListId, task: NewTask) -> Result<Task, RemoteError> {
        self.hold(Route::CreateTask(list)).await?;
        self.inner.create_task(list, task).await
    }

    async fn update_task(
        &self,
        list: TaskListId,
        id: TaskId,
        edit: TaskEdit,
    ) -> Result<(), RemoteError> {
        self.hold(Route::UpdateTask { list, task: id }).await?;
        self.inner.update_task(list, id, edit).await
    }

    async fn delete_task(&self, list: TaskListId, id: TaskId) -> Result<(), RemoteError> {
        self.hold(Route::DeleteTask { list, task: id }).await?;
        self.inner.delete_task(list, id).await
    }

    async fn toggle_completion(&self, list: TaskListId, id: TaskId) -> Result<(), RemoteError> {
        self.hold(Route::ToggleCompletion { list, task: id }).await?;
        self.inner.toggle_completion(list, id).await
    }

    async fn move_task(
        &self,
        list: TaskListId,
        id: TaskId,
        target: TaskId,
        position: Position,
    ) -> Result<(), RemoteError> {
        self.hold(Route::MoveTask { list, task: id }).await?;
        self.inner.move_task(list, id, target, position).await
    }

    async fn clear_completed(&self, list: TaskListId) -> Result<(), RemoteError> {
        self.hold(Route::ClearCompleted(list)).await?;
        self.inner.clear_completed(list).await
    }
}
