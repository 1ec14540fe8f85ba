//! In-process remote store.
//!
//! [`InMemoryRemote`] models the server side of the task store: it assigns
//! ids, keeps order sequences contiguous, and moves toggled tasks to the end
//! of the opposite partition. Every request is recorded so tests can assert
//! how many calls a mutation produced, and failures can be injected.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use planner_proto::order::{OrderEntry, Position};
use planner_proto::route::Route;
use planner_proto::task::{
    Completion, NewTask, Task, TaskEdit, TaskId, TaskList, TaskListId,
};

use super::{RemoteError, RemoteStore};
use crate::order::OrderSequence;
use crate::store::{Bucket, TaskBuckets};

#[derive(Debug, Default)]
struct ServerState {
    lists: HashMap<TaskListId, TaskList>,
    list_order: OrderSequence<TaskListId>,
    tasks: HashMap<TaskListId, TaskBuckets>,
}

impl ServerState {
    fn buckets(&mut self, list: TaskListId) -> Result<&mut TaskBuckets, RemoteError> {
        self.tasks
            .get_mut(&list)
            .ok_or_else(|| RemoteError::not_found(format!("task list {list}")))
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_next: usize,
    offline: bool,
}

/// Server model backed by in-memory maps.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    state: Mutex<ServerState>,
    faults: Mutex<Faults>,
    requests: Mutex<Vec<Route>>,
    latency: Option<Duration>,
}

impl InMemoryRemote {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Adds a list directly to the server state, bypassing the request log.
    pub fn seed_list(&self, name: &str) -> TaskListId {
        let list = TaskList {
            id: TaskListId::new(),
            name: name.to_string(),
        };
        let id = list.id;
        let mut state = self.state.lock();
        state.list_order.insert_at_end(id);
        state.tasks.insert(id, TaskBuckets::default());
        state.lists.insert(id, list);
        id
    }

    /// Adds a task directly to the server state, bypassing the request log.
    ///
    /// Returns `None` if the list does not exist.
    pub fn seed_task(&self, list: TaskListId, task: NewTask) -> Option<TaskId> {
        let task = Task::new(TaskId::new(), task.label, task.completed, task.due_date);
        let id = task.id();
        let mut state = self.state.lock();
        let buckets = state.tasks.get_mut(&list)?;
        buckets.get_mut(task.completion()).push(task);
        Some(id)
    }

    /// Fails the next `count` requests with a `500` status.
    pub fn fail_next(&self, count: usize) {
        self.faults.lock().fail_next = count;
    }

    /// While offline every request fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().offline = offline;
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<Route> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Server-side tasks of one partition, in custom order.
    #[must_use]
    pub fn tasks_in_order(&self, list: TaskListId, completion: Completion) -> Vec<Task> {
        let state = self.state.lock();
        let Some(buckets) = state.tasks.get(&list) else {
            return Vec::new();
        };
        let bucket = buckets.get(completion);
        bucket
            .order()
            .ids()
            .filter_map(|id| bucket.task(id).cloned())
            .collect()
    }

    /// Server-side lists, in custom order.
    #[must_use]
    pub fn lists_in_order(&self) -> Vec<TaskList> {
        let state = self.state.lock();
        state
            .list_order
            .ids()
            .filter_map(|id| state.lists.get(&id).cloned())
            .collect()
    }

    async fn begin(&self, route: Route) -> Result<(), RemoteError> {
        self.requests.lock().push(route);
        tracing::debug!(%route, "remote request");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut faults = self.faults.lock();
        if faults.offline {
            return Err(RemoteError::Transport("server unreachable".to_string()));
        }
        if faults.fail_next > 0 {
            faults.fail_next -= 1;
            return Err(RemoteError::Status {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn task_not_found(id: TaskId) -> RemoteError {
    RemoteError::not_found(format!("task {id}"))
}

fn move_error(err: &crate::order::OrderError) -> RemoteError {
    RemoteError::Status {
        status: 400,
        body: err.to_string(),
    }
}

impl RemoteStore for InMemoryRemote {
    async fn list_task_lists(&self) -> Result<Vec<TaskList>, RemoteError> {
        self.begin(Route::ListTaskLists).await?;
        let state = self.state.lock();
        let mut lists: Vec<TaskList> = state.lists.values().cloned().collect();
        lists.sort_by_key(|l| l.id);
        Ok(lists)
    }

    async fn task_list_order(&self) -> Result<Vec<OrderEntry<TaskListId>>, RemoteError> {
        self.begin(Route::TaskListOrder).await?;
        Ok(self.state.lock().list_order.entries().to_vec())
    }

    async fn create_task_list(&self, name: &str) -> Result<TaskList, RemoteError> {
        self.begin(Route::CreateTaskList).await?;
        let list = TaskList {
            id: TaskListId::new(),
            name: name.to_string(),
        };
        let mut state = self.state.lock();
        state.list_order.insert_at_end(list.id);
        state.tasks.insert(list.id, TaskBuckets::default());
        state.lists.insert(list.id, list.clone());
        Ok(list)
    }

    async fn rename_task_list(&self, id: TaskListId, name: &str) -> Result<(), RemoteError> {
        self.begin(Route::RenameTaskList(id)).await?;
        let mut state = self.state.lock();
        let list = state
            .lists
            .get_mut(&id)
            .ok_or_else(|| RemoteError::not_found(format!("task list {id}")))?;
        list.name = name.to_string();
        Ok(())
    }

    async fn delete_task_list(&self, id: TaskListId) -> Result<(), RemoteError> {
        self.begin(Route::DeleteTaskList(id)).await?;
        let mut state = self.state.lock();
        if state.lists.remove(&id).is_none() {
            return Err(RemoteError::not_found(format!("task list {id}")));
        }
        state.list_order.remove(id);
        state.tasks.remove(&id);
        Ok(())
    }

    async fn move_task_list(
        &self,
        id: TaskListId,
        target: TaskListId,
        position: Position,
    ) -> Result<(), RemoteError> {
        self.begin(Route::MoveTaskList(id)).await?;
        self.state
            .lock()
            .list_order
            .move_relative(id, target, position)
            .map_err(|e| move_error(&e))
    }

    async fn list_tasks(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> Result<Vec<Task>, RemoteError> {
        self.begin(Route::ListTasks { list, completion }).await?;
        let mut state = self.state.lock();
        let bucket = state.buckets(list)?.get(completion);
        let mut tasks: Vec<Task> = bucket.tasks().cloned().collect();
        tasks.sort_by_key(Task::id);
        Ok(tasks)
    }

    async fn task_order(
        &self,
        list: TaskListId,
        completion: Completion,
    ) -> Result<Vec<OrderEntry<TaskId>>, RemoteError> {
        self.begin(Route::TaskOrder { list, completion }).await?;
        let mut state = self.state.lock();
        Ok(state.buckets(list)?.get(completion).order().entries().to_vec())
    }

    async fn create_task(&self, list: TaskListId, task: NewTask) -> Result<Task, RemoteError> {
        self.begin(Route::CreateTask(list)).await?;
        let created = Task::new(TaskId::new(), task.label, task.completed, task.due_date);
        let mut state = self.state.lock();
        state
            .buckets(list)?
            .get_mut(created.completion())
            .push(created.clone());
        Ok(created)
    }

    async fn update_task(
        &self,
        list: TaskListId,
        id: TaskId,
        edit: TaskEdit,
    ) -> Result<(), RemoteError> {
        self.begin(Route::UpdateTask { list, task: id }).await?;
        let mut state = self.state.lock();
        let buckets = state.buckets(list)?;
        let completion = buckets.locate(id).ok_or_else(|| task_not_found(id))?;
        let bucket = buckets.get_mut(completion);
        let (task, position) = bucket.take(id).ok_or_else(|| task_not_found(id))?;
        let mut task = task.scheduled(edit.due_date);
        task.set_label(edit.label);
        bucket.insert_at(task, position);
        Ok(())
    }

    async fn delete_task(&self, list: TaskListId, id: TaskId) -> Result<(), RemoteError> {
        self.begin(Route::DeleteTask { list, task: id }).await?;
        let mut state = self.state.lock();
        let buckets = state.buckets(list)?;
        let completion = buckets.locate(id).ok_or_else(|| task_not_found(id))?;
        buckets.get_mut(completion).take(id);
        Ok(())
    }

    async fn toggle_completion(&self, list: TaskListId, id: TaskId) -> Result<(), RemoteError> {
        self.begin(Route::ToggleCompletion { list, task: id }).await?;
        let mut state = self.state.lock();
        let buckets = state.buckets(list)?;
        let completion = buckets.locate(id).ok_or_else(|| task_not_found(id))?;
        let (mut task, _) = buckets
            .get_mut(completion)
            .take(id)
            .ok_or_else(|| task_not_found(id))?;
        task.set_completed(!task.completed());
        buckets.get_mut(completion.toggled()).push(task);
        Ok(())
    }

    async fn move_task(
        &self,
        list: TaskListId,
        id: TaskId,
        target: TaskId,
        position: Position,
    ) -> Result<(), RemoteError> {
        self.begin(Route::MoveTask { list, task: id }).await?;
        let mut state = self.state.lock();
        let buckets = state.buckets(list)?;
        let completion = buckets.locate(id).ok_or_else(|| task_not_found(id))?;
        buckets
            .get_mut(completion)
            .order_mut()
            .move_relative(id, target, position)
            .map_err(|e| move_error(&e))
    }

    async fn clear_completed(&self, list: TaskListId) -> Result<(), RemoteError> {
        self.begin(Route::ClearCompleted(list)).await?;
        let mut state = self.state.lock();
        *state.buckets(list)?.get_mut(Completion::Complete) = Bucket::default();
        Ok(())
    }
}
