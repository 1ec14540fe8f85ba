//! Optimistic mutation engine.
//!
//! Every mutation applies its patch to the [`EntityStore`] synchronously,
//! marks the touched entities as pending, and spawns exactly one remote
//! request. The caller gets a [`PendingMutation`] back immediately and may
//! issue further mutations before the first one settles.
//!
//! When a request fails the mutation's rollback runs once. Each rollback puts
//! back only the fields, positions, or memberships its own patch changed.
//! Field writes are tracked per mutation in the store: a failed edit restores
//! a field only while it is the newest unsettled write to it, and an accepted
//! edit makes every older write to the same field final. Positions and
//! memberships are restored only while they still hold what the patch left.
//! Overlapping mutations on the same entity can therefore settle in any order
//! without a late rollback discarding a newer change.
//!
//! Mutations must be issued from within a Tokio runtime.

mod identity;
mod lists;
mod tasks;

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use planner_proto::task::{Completion, Task, TaskId, TaskListId, ValidationError};

use crate::order::{OrderError, OrderSequence};
use crate::remote::{RemoteError, RemoteStore};
use crate::store::{Bucket, EntityStore, Query, QueryState, TaskBuckets};
use crate::view::{self, Filter, SortMode};

use identity::IdentityMap;

/// Errors returned by mutations and loads.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MutationError {
    /// The remote request failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The addressed task list is not in the store.
    #[error("task list {0} not found")]
    ListNotFound(TaskListId),

    /// The addressed task is not in the store.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A move referenced an id missing from the order sequence.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The input failed validation; nothing was patched.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The mutation addressed an entity whose creation was rolled back.
    #[error("creation of {0} was not confirmed by the server")]
    Unconfirmed(Uuid),

    /// A move used the moved entry as its own anchor.
    #[error("cannot move an entry relative to itself")]
    SelfAnchored,

    /// The task driving the request was cancelled or panicked.
    #[error("mutation task aborted")]
    Aborted,
}

/// Identifier of one issued mutation, unique per [`Planner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Which operation a mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Create a task.
    CreateTask,
    /// Edit a task's label and due date.
    UpdateTask,
    /// Delete a task.
    DeleteTask,
    /// Flip a task's completion flag.
    ToggleCompletion,
    /// Reorder a task.
    MoveTask,
    /// Delete every completed task of a list.
    ClearCompleted,
    /// Create a task list.
    CreateList,
    /// Rename a task list.
    RenameList,
    /// Delete a task list.
    DeleteList,
    /// Reorder a task list.
    MoveList,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::ToggleCompletion => "toggle_completion",
            Self::MoveTask => "move_task",
            Self::ClearCompleted => "clear_completed",
            Self::CreateList => "create_list",
            Self::RenameList => "rename_list",
            Self::DeleteList => "delete_list",
            Self::MoveList => "move_list",
        };
        f.write_str(name)
    }
}

/// Notifications emitted as mutations settle.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
    /// The request succeeded.
    Settled {
        /// Mutation that settled.
        mutation: MutationId,
        /// Its operation.
        kind: MutationKind,
    },
    /// The request failed and the optimistic patch was rolled back.
    RolledBack {
        /// Mutation that failed.
        mutation: MutationId,
        /// Its operation.
        kind: MutationKind,
        /// Why it failed.
        error: MutationError,
    },
    /// A created entity moved from its temporary id to the server id.
    IdentityRewritten {
        /// Client-side temporary id.
        temp: Uuid,
        /// Server-assigned id.
        real: Uuid,
    },
}

/// Tunables for a [`Planner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Capacity of the mutation event channel.
    pub event_buffer: usize,
    /// Per-request timeout; expiry counts as a failure.
    pub request_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            request_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Handle to a mutation whose request is in flight.
#[derive(Debug)]
pub struct PendingMutation<T> {
    id: MutationId,
    kind: MutationKind,
    handle: JoinHandle<Result<T, MutationError>>,
}

impl<T> PendingMutation<T> {
    /// Returns the mutation id.
    #[must_use]
    pub const fn id(&self) -> MutationId {
        self.id
    }

    /// Returns the operation.
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Whether the request has settled and its patch is reconciled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits until the mutation settles.
    ///
    /// By the time this returns, a failed mutation has already been rolled
    /// back and a successful creation has had its identity rewritten.
    ///
    /// # Errors
    ///
    /// Returns the error that caused the rollback.
    pub async fn settled(self) -> Result<T, MutationError> {
        self.handle.await.unwrap_or(Err(MutationError::Aborted))
    }
}

/// Waits for every mutation in `pending`, returning results in input order.
pub async fn settle_all<T>(
    pending: impl IntoIterator<Item = PendingMutation<T>>,
) -> Vec<Result<T, MutationError>> {
    futures_util::future::join_all(pending.into_iter().map(PendingMutation::settled)).await
}

/// Undoes a relative move.
///
/// If nothing reordered `sequence` since the move, the whole pre-move
/// snapshot comes back. Otherwise only the moved entry returns to its old
/// position. `moved` is the id at issue time and the id it resolves to now.
pub(crate) fn restore_sequence<I: Copy + Eq + fmt::Display>(
    sequence: &mut OrderSequence<I>,
    moved: (I, I),
    before: &OrderSequence<I>,
    after: &OrderSequence<I>,
) {
    if sequence == after {
        *sequence = before.clone();
        return;
    }
    let (original, current) = moved;
    let Some(old) = before.position(original) else {
        return;
    };
    if sequence.remove(current).is_some() {
        sequence.insert_at(current, old);
    }
}

/// Undoes one optimistic patch.
pub(crate) type Rollback = Box<dyn FnOnce(&mut EntityStore) + Send>;

/// State shared between the [`Planner`] handle and its in-flight requests.
pub(crate) struct Shared<R> {
    store: RwLock<EntityStore>,
    remote: R,
    identities: IdentityMap,
    events: mpsc::Sender<MutationEvent>,
    request_timeout: Option<Duration>,
}

impl<R: RemoteStore> Shared<R> {
    /// Runs one remote request under the configured timeout.
    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, MutationError> {
        let result = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or(Err(RemoteError::Timeout)),
            None => request.await,
        };
        Ok(result?)
    }

    async fn resolve_task(&self, id: TaskId) -> Result<TaskId, MutationError> {
        self.identities
            .resolve(*id.as_uuid())
            .await
            .map(TaskId::from_uuid)
    }

    async fn resolve_list(&self, id: TaskListId) -> Result<TaskListId, MutationError> {
        self.identities
            .resolve(*id.as_uuid())
            .await
            .map(TaskListId::from_uuid)
    }

    fn emit(&self, event: MutationEvent) {
        let _ = self.events.try_send(event);
    }

    fn settle<T>(
        &self,
        id: MutationId,
        kind: MutationKind,
        touched: &[Uuid],
        rollback: Rollback,
        result: &Result<T, MutationError>,
    ) {
        let mut store = self.store.write();
        match result {
            Ok(_) => {
                store.confirm_writes(id);
                store.clear_pending(touched);
                drop(store);
                tracing::debug!(mutation = %id, %kind, "mutation settled");
                self.emit(MutationEvent::Settled { mutation: id, kind });
            }
            Err(error) => {
                rollback(&mut *store);
                store.clear_pending(touched);
                drop(store);
                tracing::warn!(mutation = %id, %kind, %error, "mutation failed, rolled back");
                self.emit(MutationEvent::RolledBack {
                    mutation: id,
                    kind,
                    error: error.clone(),
                });
            }
        }
    }
}

/// Client handle: owns the store and issues optimistic mutations.
pub struct Planner<R> {
    shared: Arc<Shared<R>>,
    next_mutation: AtomicU64,
}

impl<R: RemoteStore> Planner<R> {
    /// Creates a planner over `remote` with an empty store.
    ///
    /// Returns the planner and the receiving end of its event channel.
    pub fn new(remote: R, options: &EngineOptions) -> (Self, mpsc::Receiver<MutationEvent>) {
        let (events, rx) = mpsc::channel(options.event_buffer.max(1));
        let shared = Shared {
            store: RwLock::new(EntityStore::new()),
            remote,
            identities: IdentityMap::default(),
            events,
            request_timeout: options.request_timeout,
        };
        let planner = Self {
            shared: Arc::new(shared),
            next_mutation: AtomicU64::new(1),
        };
        (planner, rx)
    }

    /// Returns the remote store.
    pub fn remote(&self) -> &R {
        &self.shared.remote
    }

    /// Runs `f` against the current store state.
    pub fn read<T>(&self, f: impl FnOnce(&EntityStore) -> T) -> T {
        f(&*self.shared.store.read())
    }

    /// Returns a copy of the current store state.
    pub fn snapshot(&self) -> EntityStore {
        self.shared.store.read().clone()
    }

    /// Returns the visible tasks of `list` for the given filter and sort.
    pub fn visible_tasks(&self, list: TaskListId, filter: Filter, sort: SortMode) -> Vec<Task> {
        let store = self.shared.store.read();
        let rows = view::rows(&store, list);
        view::project(&rows, filter, sort)
            .into_iter()
            .map(|row| row.task.clone())
            .collect()
    }

    /// Fetches all task lists and their order, replacing the cached ones.
    ///
    /// # Errors
    ///
    /// Returns the remote error; the query is then marked
    /// [`QueryState::Failed`] and the cache is left unchanged.
    pub async fn load_lists(&self) -> Result<(), MutationError> {
        let shared = &self.shared;
        shared
            .store
            .write()
            .set_query_state(Query::Lists, QueryState::Loading);
        let result = tokio::try_join!(
            shared.call(shared.remote.list_task_lists()),
            shared.call(shared.remote.task_list_order()),
        );
        let mut store = shared.store.write();
        match result {
            Ok((lists, order)) => {
                let count = lists.len();
                store.replace_lists(lists, order);
                store.set_query_state(Query::Lists, QueryState::Ready);
                drop(store);
                tracing::debug!(count, "task lists loaded");
                Ok(())
            }
            Err(error) => {
                store.set_query_state(Query::Lists, QueryState::Failed(error.to_string()));
                drop(store);
                tracing::warn!(%error, "loading task lists failed");
                Err(error)
            }
        }
    }

    /// Fetches both partitions of `list` with their orders, replacing the
    /// cached ones.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ListNotFound`] for a list not in the store,
    /// or the remote error; the query is then marked [`QueryState::Failed`].
    pub async fn load_tasks(&self, list: TaskListId) -> Result<(), MutationError> {
        let shared = &self.shared;
        let list = {
            let mut store = shared.store.write();
            let list = store.canonical_list(list);
            if store.task_list(list).is_none() {
                return Err(MutationError::ListNotFound(list));
            }
            store.set_query_state(Query::Tasks(list), QueryState::Loading);
            list
        };
        let result = match shared.resolve_list(list).await {
            Ok(real) => tokio::try_join!(
                shared.call(shared.remote.list_tasks(real, Completion::Incomplete)),
                shared.call(shared.remote.task_order(real, Completion::Incomplete)),
                shared.call(shared.remote.list_tasks(real, Completion::Complete)),
                shared.call(shared.remote.task_order(real, Completion::Complete)),
            ),
            Err(error) => Err(error),
        };
        let mut store = shared.store.write();
        let list = store.canonical_list(list);
        match result {
            Ok((incomplete, incomplete_order, complete, complete_order)) => {
                let buckets = TaskBuckets::new(
                    Bucket::from_remote(incomplete, incomplete_order),
                    Bucket::from_remote(complete, complete_order),
                );
                store.replace_buckets(list, buckets);
                store.set_query_state(Query::Tasks(list), QueryState::Ready);
                drop(store);
                tracing::debug!(%list, "tasks loaded");
                Ok(())
            }
            Err(error) => {
                store.set_query_state(Query::Tasks(list), QueryState::Failed(error.to_string()));
                drop(store);
                tracing::warn!(%list, %error, "loading tasks failed");
                Err(error)
            }
        }
    }

    /// Allocates the id of the next mutation, before its patch is applied.
    fn next_id(&self) -> MutationId {
        MutationId(self.next_mutation.fetch_add(1, Ordering::Relaxed))
    }

    /// Spawns the remote side of a mutation whose patch is already applied.
    ///
    /// `touched` must already be marked pending in the store.
    fn launch<T, F, Fut>(
        &self,
        id: MutationId,
        kind: MutationKind,
        touched: Vec<Uuid>,
        rollback: Rollback,
        request: F,
    ) -> PendingMutation<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Shared<R>>) -> Fut,
        Fut: Future<Output = Result<T, MutationError>> + Send + 'static,
    {
        tracing::debug!(mutation = %id, %kind, "optimistic patch applied");
        let request = request(Arc::clone(&self.shared));
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            // A panicking request still settles, so its patch is rolled back.
            let result = AssertUnwindSafe(request)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(mutation = %id, %kind, "mutation request panicked");
                    Err(MutationError::Aborted)
                });
            shared.settle(id, kind, &touched, rollback, &result);
            result
        });
        PendingMutation { id, kind, handle }
    }
}
