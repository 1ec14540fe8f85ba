//! Normalized client-side cache of task lists, tasks, and order sequences.
//!
//! Entities and order sequences are stored separately: during an in-flight
//! optimistic mutation an id may be present in one and not the other. Each
//! list's tasks are partitioned into an incomplete and a complete [`Bucket`],
//! each with its own order sequence.
//!
//! Readers are public. Writers are crate-private: only the optimistic
//! mutation engine changes store state.

use std::collections::HashMap;

use uuid::Uuid;

use planner_proto::order::OrderEntry;
use planner_proto::task::{Completion, DueDate, Task, TaskId, TaskList, TaskListId};

use crate::engine::MutationId;
use crate::order::OrderSequence;

/// Tasks of one completion partition plus their order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    tasks: HashMap<TaskId, Task>,
    order: OrderSequence<TaskId>,
}

impl Bucket {
    /// Builds a bucket from server data.
    #[must_use]
    pub fn from_remote(tasks: Vec<Task>, order: Vec<OrderEntry<TaskId>>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.id(), t)).collect(),
            order: OrderSequence::from_entries(order),
        }
    }

    /// Returns the task with `id`.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Iterates over all tasks in unspecified order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Returns the order sequence.
    #[must_use]
    pub const fn order(&self) -> &OrderSequence<TaskId> {
        &self.order
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the bucket has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub(crate) const fn order_mut(&mut self) -> &mut OrderSequence<TaskId> {
        &mut self.order
    }

    /// Inserts the task and appends it to the order.
    pub(crate) fn push(&mut self, task: Task) {
        self.order.insert_at_end(task.id());
        self.tasks.insert(task.id(), task);
    }

    /// Inserts the task at array position `position` of the order.
    pub(crate) fn insert_at(&mut self, task: Task, position: Option<usize>) {
        if let Some(position) = position {
            self.order.insert_at(task.id(), position);
        }
        self.tasks.insert(task.id(), task);
    }

    /// Removes the task and its order entry, returning the task and the
    /// order position it held.
    pub(crate) fn take(&mut self, id: TaskId) -> Option<(Task, Option<usize>)> {
        let task = self.tasks.remove(&id)?;
        let position = self.order.remove(id);
        Some((task, position))
    }

    /// Rewrites the id of a task in both the entity map and the order,
    /// keeping its position.
    pub(crate) fn rewrite_id(&mut self, old: TaskId, new: TaskId) -> bool {
        let Some(task) = self.tasks.remove(&old) else {
            return false;
        };
        self.tasks.insert(new, task.with_id(new));
        self.order.rewrite_id(old, new);
        true
    }
}

/// The two partitions of one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBuckets {
    incomplete: Bucket,
    complete: Bucket,
}

impl TaskBuckets {
    /// Returns the bucket for `completion`.
    #[must_use]
    pub const fn get(&self, completion: Completion) -> &Bucket {
        match completion {
            Completion::Incomplete => &self.incomplete,
            Completion::Complete => &self.complete,
        }
    }

    pub(crate) const fn get_mut(&mut self, completion: Completion) -> &mut Bucket {
        match completion {
            Completion::Incomplete => &mut self.incomplete,
            Completion::Complete => &mut self.complete,
        }
    }

    /// Finds which partition holds `id`.
    #[must_use]
    pub fn locate(&self, id: TaskId) -> Option<Completion> {
        [Completion::Incomplete, Completion::Complete]
            .into_iter()
            .find(|c| self.get(*c).task(id).is_some())
    }
}

/// A read query whose result populates the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    /// Task lists and their order.
    Lists,
    /// Both partitions of one list, with their orders.
    Tasks(TaskListId),
}

/// Outcome of the latest load for a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    /// A load is in progress.
    Loading,
    /// The last load succeeded.
    Ready,
    /// The last load failed; the view shows an error with a retry action.
    Failed(String),
}

/// A field that optimistic edits overwrite in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Field {
    TaskLabel,
    TaskDueDate,
    ListName,
}

impl Field {
    const ALL: [Self; 3] = [Self::TaskLabel, Self::TaskDueDate, Self::ListName];
}

/// A field's value before an edit overwrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldValue {
    Text(String),
    Date(Option<DueDate>),
}

/// One unsettled write to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldWrite {
    mutation: MutationId,
    before: FieldValue,
}

/// Client-side cache of the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    lists: HashMap<TaskListId, TaskList>,
    list_order: OrderSequence<TaskListId>,
    buckets: HashMap<TaskListId, TaskBuckets>,
    /// In-flight mutation count per entity id.
    pending: HashMap<Uuid, usize>,
    /// Temporary id to server id, for lists and tasks alike.
    aliases: HashMap<Uuid, Uuid>,
    queries: HashMap<Query, QueryState>,
    /// Unsettled writes per entity field, oldest first.
    writes: HashMap<(Uuid, Field), Vec<FieldWrite>>,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- readers --

    /// Returns the list with `id`, following temp-id aliases.
    #[must_use]
    pub fn task_list(&self, id: TaskListId) -> Option<&TaskList> {
        self.lists.get(&self.canonical_list(id))
    }

    /// Returns all lists in custom order; lists without an order entry follow.
    #[must_use]
    pub fn lists_in_order(&self) -> Vec<&TaskList> {
        let mut lists: Vec<&TaskList> = self
            .list_order
            .ids()
            .filter_map(|id| self.lists.get(&id))
            .collect();
        let mut unordered: Vec<&TaskList> = self
            .lists
            .values()
            .filter(|l| !self.list_order.contains(l.id))
            .collect();
        unordered.sort_by_key(|l| l.id);
        lists.extend(unordered);
        lists
    }

    /// Returns the order sequence of task lists.
    #[must_use]
    pub const fn list_order(&self) -> &OrderSequence<TaskListId> {
        &self.list_order
    }

    /// Returns both partitions of a list.
    #[must_use]
    pub fn buckets(&self, list: TaskListId) -> Option<&TaskBuckets> {
        self.buckets.get(&self.canonical_list(list))
    }

    /// Returns one partition of a list.
    #[must_use]
    pub fn bucket(&self, list: TaskListId, completion: Completion) -> Option<&Bucket> {
        self.buckets(list).map(|b| b.get(completion))
    }

    /// Returns a task and the partition holding it.
    #[must_use]
    pub fn task(&self, list: TaskListId, id: TaskId) -> Option<(&Task, Completion)> {
        let buckets = self.buckets(list)?;
        let id = self.canonical_task(id);
        let completion = buckets.locate(id)?;
        buckets.get(completion).task(id).map(|t| (t, completion))
    }

    /// Whether any mutation touching `id` is still in flight.
    #[must_use]
    pub fn is_pending(&self, id: &Uuid) -> bool {
        self.pending
            .get(&self.canonical(*id))
            .is_some_and(|n| *n > 0)
    }

    /// Whether any mutation at all is still in flight.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the state of the latest load for `query`.
    #[must_use]
    pub fn query_state(&self, query: Query) -> Option<&QueryState> {
        let query = match query {
            Query::Tasks(list) => Query::Tasks(self.canonical_list(list)),
            Query::Lists => Query::Lists,
        };
        self.queries.get(&query)
    }

    /// Maps a temporary list id to the server id it was rewritten to.
    #[must_use]
    pub fn canonical_list(&self, id: TaskListId) -> TaskListId {
        TaskListId::from_uuid(self.canonical(*id.as_uuid()))
    }

    /// Maps a temporary task id to the server id it was rewritten to.
    #[must_use]
    pub fn canonical_task(&self, id: TaskId) -> TaskId {
        TaskId::from_uuid(self.canonical(*id.as_uuid()))
    }

    fn canonical(&self, id: Uuid) -> Uuid {
        self.aliases.get(&id).copied().unwrap_or(id)
    }

    // -- writers (engine only) --

    pub(crate) fn insert_list(&mut self, list: TaskList, position: Option<usize>) {
        match position {
            Some(position) => self.list_order.insert_at(list.id, position),
            None => self.list_order.insert_at_end(list.id),
        }
        self.buckets.entry(list.id).or_default();
        self.lists.insert(list.id, list);
    }

    pub(crate) fn list_mut(&mut self, id: TaskListId) -> Option<&mut TaskList> {
        self.lists.get_mut(&id)
    }

    pub(crate) const fn list_order_mut(&mut self) -> &mut OrderSequence<TaskListId> {
        &mut self.list_order
    }

    /// Removes a list with its tasks, returning what is needed to restore it.
    pub(crate) fn take_list(&mut self, id: TaskListId) -> Option<RemovedList> {
        let list = self.lists.remove(&id)?;
        let position = self.list_order.remove(id);
        let buckets = self.buckets.remove(&id).unwrap_or_default();
        Some(RemovedList {
            list,
            position,
            buckets,
        })
    }

    pub(crate) fn restore_list(&mut self, removed: RemovedList) {
        let id = removed.list.id;
        if let Some(position) = removed.position {
            self.list_order.insert_at(id, position);
        }
        self.buckets.insert(id, removed.buckets);
        self.lists.insert(id, removed.list);
    }

    pub(crate) fn rewrite_list_id(&mut self, old: TaskListId, new: TaskListId) {
        if let Some(list) = self.lists.remove(&old) {
            self.lists.insert(new, TaskList { id: new, ..list });
        }
        if let Some(buckets) = self.buckets.remove(&old) {
            self.buckets.insert(new, buckets);
        }
        self.list_order.rewrite_id(old, new);
        if let Some(state) = self.queries.remove(&Query::Tasks(old)) {
            self.queries.insert(Query::Tasks(new), state);
        }
        self.record_alias(*old.as_uuid(), *new.as_uuid());
    }

    /// Rewrites a task id in whichever partition of `list` holds it and
    /// records the alias. Returns `false` if the task is not in the store.
    pub(crate) fn rewrite_task_id(&mut self, list: TaskListId, old: TaskId, new: TaskId) -> bool {
        self.record_alias(*old.as_uuid(), *new.as_uuid());
        let Some(buckets) = self.buckets.get_mut(&list) else {
            return false;
        };
        match buckets.locate(old) {
            Some(completion) => buckets.get_mut(completion).rewrite_id(old, new),
            None => false,
        }
    }

    /// Maps `old` to `new` and moves pending counters and field writes
    /// along with it.
    fn record_alias(&mut self, old: Uuid, new: Uuid) {
        self.aliases.insert(old, new);
        if let Some(count) = self.pending.remove(&old) {
            *self.pending.entry(new).or_default() += count;
        }
        for field in Field::ALL {
            if let Some(mut older) = self.writes.remove(&(old, field)) {
                let stack = self.writes.entry((new, field)).or_default();
                older.append(stack);
                *stack = older;
            }
        }
    }

    /// Records that `mutation` overwrote `field` of `entity`, which held
    /// `before`.
    pub(crate) fn record_write(
        &mut self,
        entity: Uuid,
        field: Field,
        mutation: MutationId,
        before: FieldValue,
    ) {
        let entity = self.canonical(entity);
        self.writes
            .entry((entity, field))
            .or_default()
            .push(FieldWrite { mutation, before });
    }

    /// The server accepted `mutation`: its writes, and every older write to
    /// the same fields, are final.
    pub(crate) fn confirm_writes(&mut self, mutation: MutationId) {
        self.writes.retain(|_, stack| {
            if let Some(index) = stack.iter().position(|w| w.mutation == mutation) {
                stack.drain(..=index);
            }
            !stack.is_empty()
        });
    }

    /// Withdraws `mutation`'s write to `field` of `entity`.
    ///
    /// Returns the value to put back when that write is still the newest
    /// unsettled one. Otherwise the next newer write inherits its `before`
    /// and the field keeps its current value. Returns `None` as well when a
    /// newer accepted write already made the field final.
    pub(crate) fn revert_write(
        &mut self,
        entity: Uuid,
        field: Field,
        mutation: MutationId,
    ) -> Option<FieldValue> {
        let key = (self.canonical(entity), field);
        let stack = self.writes.get_mut(&key)?;
        let index = stack.iter().position(|w| w.mutation == mutation)?;
        let withdrawn = stack.remove(index);
        let restore = match stack.get_mut(index) {
            Some(newer) => {
                newer.before = withdrawn.before;
                None
            }
            None => Some(withdrawn.before),
        };
        if stack.is_empty() {
            self.writes.remove(&key);
        }
        restore
    }

    pub(crate) fn buckets_mut(&mut self, list: TaskListId) -> Option<&mut TaskBuckets> {
        self.buckets.get_mut(&list)
    }

    pub(crate) fn replace_lists(
        &mut self,
        lists: Vec<TaskList>,
        order: Vec<OrderEntry<TaskListId>>,
    ) {
        self.buckets.retain(|id, _| lists.iter().any(|l| l.id == *id));
        for list in &lists {
            self.buckets.entry(list.id).or_default();
        }
        self.lists = lists.into_iter().map(|l| (l.id, l)).collect();
        self.list_order = OrderSequence::from_entries(order);
    }

    pub(crate) fn replace_buckets(&mut self, list: TaskListId, buckets: TaskBuckets) {
        self.buckets.insert(list, buckets);
    }

    pub(crate) fn set_query_state(&mut self, query: Query, state: QueryState) {
        self.queries.insert(query, state);
    }

    pub(crate) fn mark_pending(&mut self, ids: &[Uuid]) {
        for id in ids {
            let id = self.canonical(*id);
            *self.pending.entry(id).or_default() += 1;
        }
    }

    pub(crate) fn clear_pending(&mut self, ids: &[Uuid]) {
        for id in ids {
            let id = self.canonical(*id);
            if let Some(count) = self.pending.get_mut(&id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.pending.remove(&id);
                }
            }
        }
    }
}

impl TaskBuckets {
    pub(crate) const fn new(incomplete: Bucket, complete: Bucket) -> Self {
        Self {
            incomplete,
            complete,
        }
    }
}

/// A removed list with everything needed to put it back.
#[derive(Debug, Clone)]
pub(crate) struct RemovedList {
    pub(crate) list: TaskList,
    pub(crate) position: Option<usize>,
    pub(crate) buckets: TaskBuckets,
}
