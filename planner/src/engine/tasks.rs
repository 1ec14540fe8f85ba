//! Task mutations: create, edit, delete, toggle, move, clear completed.

use planner_proto::order::Position;
use planner_proto::task::{
    Completion, NewTask, Task, TaskEdit, TaskId, TaskListId, validate_label,
};

use super::identity::Identity;
use super::{
    MutationError, MutationEvent, MutationId, MutationKind, PendingMutation, Planner, Rollback,
    Shared, restore_sequence,
};
use crate::remote::RemoteStore;
use crate::store::{EntityStore, Field, FieldValue};

impl<R: RemoteStore> Planner<R> {
    /// Creates a task at the end of its partition under a temporary id.
    ///
    /// Returns the temporary id and the pending mutation, which resolves to
    /// the server-assigned id. Once it settles the store holds the task under
    /// the server id at the position the temporary entry had.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Validation`] for an empty label and
    /// [`MutationError::ListNotFound`] for an unknown list. Nothing is
    /// patched or sent in either case.
    pub fn create_task(
        &self,
        list: TaskListId,
        task: NewTask,
    ) -> Result<(TaskId, PendingMutation<TaskId>), MutationError> {
        validate_label(&task.label)?;
        let temp = TaskId::new();
        let optimistic = Task::new(temp, task.label.clone(), task.completed, task.due_date.clone());
        let list = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let buckets = store
                .buckets_mut(list)
                .ok_or(MutationError::ListNotFound(list))?;
            buckets
                .get_mut(optimistic.completion())
                .push(optimistic.clone());
            store.mark_pending(&[*temp.as_uuid()]);
            list
        };
        let identity = self.shared.identities.register(*temp.as_uuid());
        let rollback: Rollback =
            Box::new(move |store: &mut EntityStore| remove_task(store, list, temp));

        let pending = self.launch(
            self.next_id(),
            MutationKind::CreateTask,
            vec![*temp.as_uuid()],
            rollback,
            move |shared| async move {
                let result = match shared.resolve_list(list).await {
                    Ok(real_list) => shared.call(shared.remote.create_task(real_list, task)).await,
                    Err(error) => Err(error),
                };
                match result {
                    Ok(created) => {
                        let real = created.id();
                        shared.reconcile_created_task(list, temp, &optimistic, created);
                        identity.send_replace(Identity::Resolved(*real.as_uuid()));
                        Ok(real)
                    }
                    Err(error) => {
                        identity.send_replace(Identity::Failed);
                        Err(error)
                    }
                }
            },
        );
        Ok((temp, pending))
    }

    /// Replaces a task's label and due date in place.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Validation`] for an empty label, or
    /// [`MutationError::ListNotFound`] / [`MutationError::TaskNotFound`].
    pub fn update_task(
        &self,
        list: TaskListId,
        task: TaskId,
        edit: TaskEdit,
    ) -> Result<PendingMutation<()>, MutationError> {
        validate_label(&edit.label)?;
        let id = self.next_id();
        let (list, task) = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let task = store.canonical_task(task);
            let slot = task_mut(&mut store, list, task)?;
            let before = slot.clone();
            let mut after = before.clone().scheduled(edit.due_date.clone());
            after.set_label(edit.label.clone());
            *slot = after;
            let entity = *task.as_uuid();
            store.record_write(
                entity,
                Field::TaskLabel,
                id,
                FieldValue::Text(before.label().to_string()),
            );
            store.record_write(
                entity,
                Field::TaskDueDate,
                id,
                FieldValue::Date(before.due_date().cloned()),
            );
            store.mark_pending(&[entity]);
            (list, task)
        };
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            restore_fields(store, list, task, id);
        });

        Ok(self.launch(
            id,
            MutationKind::UpdateTask,
            vec![*task.as_uuid()],
            rollback,
            move |shared| async move {
                let (list, task) = shared.resolve_task_in(list, task).await?;
                shared
                    .call(shared.remote.update_task(list, task, edit))
                    .await
            },
        ))
    }

    /// Removes a task and its order entry.
    ///
    /// Deleting a task whose creation later fails settles successfully
    /// without a request: the task never reached the server.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ListNotFound`] or [`MutationError::TaskNotFound`].
    pub fn delete_task(
        &self,
        list: TaskListId,
        task: TaskId,
    ) -> Result<PendingMutation<()>, MutationError> {
        let (list, task, removed, completion, position) = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let task = store.canonical_task(task);
            let buckets = store
                .buckets_mut(list)
                .ok_or(MutationError::ListNotFound(list))?;
            let completion = buckets
                .locate(task)
                .ok_or(MutationError::TaskNotFound(task))?;
            let (removed, position) = buckets
                .get_mut(completion)
                .take(task)
                .ok_or(MutationError::TaskNotFound(task))?;
            store.mark_pending(&[*task.as_uuid()]);
            (list, task, removed, completion, position)
        };
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            reinsert_task(store, list, removed, completion, position);
        });

        Ok(self.launch(
            self.next_id(),
            MutationKind::DeleteTask,
            vec![*task.as_uuid()],
            rollback,
            move |shared| async move {
                match shared.resolve_task_in(list, task).await {
                    Ok((list, task)) => shared.call(shared.remote.delete_task(list, task)).await,
                    Err(MutationError::Unconfirmed(_)) => Ok(()),
                    Err(error) => Err(error),
                }
            },
        ))
    }

    /// Flips a task's completion flag and moves it to the end of the other
    /// partition in one patch.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ListNotFound`] or [`MutationError::TaskNotFound`].
    pub fn toggle_completion(
        &self,
        list: TaskListId,
        task: TaskId,
    ) -> Result<PendingMutation<()>, MutationError> {
        let (list, task, from, position) = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let task = store.canonical_task(task);
            let buckets = store
                .buckets_mut(list)
                .ok_or(MutationError::ListNotFound(list))?;
            let from = buckets
                .locate(task)
                .ok_or(MutationError::TaskNotFound(task))?;
            let (mut moved, position) = buckets
                .get_mut(from)
                .take(task)
                .ok_or(MutationError::TaskNotFound(task))?;
            moved.set_completed(from.toggled() == Completion::Complete);
            buckets.get_mut(from.toggled()).push(moved);
            store.mark_pending(&[*task.as_uuid()]);
            (list, task, from, position)
        };
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            untoggle(store, list, task, from, position);
        });

        Ok(self.launch(
            self.next_id(),
            MutationKind::ToggleCompletion,
            vec![*task.as_uuid()],
            rollback,
            move |shared| async move {
                let (list, task) = shared.resolve_task_in(list, task).await?;
                shared
                    .call(shared.remote.toggle_completion(list, task))
                    .await
            },
        ))
    }

    /// Moves a task before or after another task of the same partition.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::SelfAnchored`] when `task == target`,
    /// [`MutationError::Order`] when the target is not in the task's
    /// partition, or [`MutationError::ListNotFound`] /
    /// [`MutationError::TaskNotFound`]. Nothing is patched or sent.
    pub fn move_task(
        &self,
        list: TaskListId,
        task: TaskId,
        target: TaskId,
        position: Position,
    ) -> Result<PendingMutation<()>, MutationError> {
        let (list, task, target, completion, before, after) = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let task = store.canonical_task(task);
            let target = store.canonical_task(target);
            if task == target {
                return Err(MutationError::SelfAnchored);
            }
            let buckets = store
                .buckets_mut(list)
                .ok_or(MutationError::ListNotFound(list))?;
            let completion = buckets
                .locate(task)
                .ok_or(MutationError::TaskNotFound(task))?;
            let order = buckets.get_mut(completion).order_mut();
            let before = order.clone();
            order.move_relative(task, target, position)?;
            let after = order.clone();
            store.mark_pending(&[*task.as_uuid()]);
            (list, task, target, completion, before, after)
        };
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            let list = store.canonical_list(list);
            let current = store.canonical_task(task);
            if let Some(buckets) = store.buckets_mut(list) {
                let order = buckets.get_mut(completion).order_mut();
                restore_sequence(order, (task, current), &before, &after);
            }
        });

        Ok(self.launch(
            self.next_id(),
            MutationKind::MoveTask,
            vec![*task.as_uuid()],
            rollback,
            move |shared| async move {
                let (list, task) = shared.resolve_task_in(list, task).await?;
                let target = shared.resolve_task(target).await?;
                shared
                    .call(shared.remote.move_task(list, task, target, position))
                    .await
            },
        ))
    }

    /// Removes every completed task of a list in one patch.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ListNotFound`] for an unknown list.
    pub fn clear_completed(&self, list: TaskListId) -> Result<PendingMutation<()>, MutationError> {
        let (list, removed, touched) = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let buckets = store
                .buckets_mut(list)
                .ok_or(MutationError::ListNotFound(list))?;
            let cleared = std::mem::take(buckets.get_mut(Completion::Complete));
            let mut removed: Vec<(Task, Option<usize>)> = cleared
                .tasks()
                .map(|t| (t.clone(), cleared.order().position(t.id())))
                .collect();
            // Ascending positions so reinsertion rebuilds the same order.
            removed.sort_by_key(|(_, position)| position.unwrap_or(usize::MAX));
            let mut touched = vec![*list.as_uuid()];
            touched.extend(removed.iter().map(|(t, _)| *t.id().as_uuid()));
            store.mark_pending(&touched);
            (list, removed, touched)
        };
        tracing::debug!(%list, count = removed.len(), "clearing completed tasks");
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            for (task, position) in removed {
                reinsert_task(store, list, task, Completion::Complete, position);
            }
        });

        Ok(self.launch(
            self.next_id(),
            MutationKind::ClearCompleted,
            touched,
            rollback,
            move |shared| async move {
                match shared.resolve_list(list).await {
                    Ok(list) => shared.call(shared.remote.clear_completed(list)).await,
                    Err(MutationError::Unconfirmed(_)) => Ok(()),
                    Err(error) => Err(error),
                }
            },
        ))
    }
}

impl<R: RemoteStore> Shared<R> {
    /// Resolves a list and a task id, waiting on pending creations.
    async fn resolve_task_in(
        &self,
        list: TaskListId,
        task: TaskId,
    ) -> Result<(TaskListId, TaskId), MutationError> {
        let list = self.resolve_list(list).await?;
        let task = self.resolve_task(task).await?;
        Ok((list, task))
    }

    /// Moves a created task from its temporary id to the server id.
    ///
    /// The server's copy replaces the optimistic one only if nothing edited
    /// the task while the creation was in flight.
    fn reconcile_created_task(
        &self,
        list: TaskListId,
        temp: TaskId,
        optimistic: &Task,
        created: Task,
    ) {
        let real = created.id();
        let mut store = self.store.write();
        let list = store.canonical_list(list);
        let untouched = store
            .task(list, temp)
            .is_some_and(|(current, _)| current == optimistic);
        let present = store.rewrite_task_id(list, temp, real);
        if untouched && created.completion() == optimistic.completion() {
            if let Some(slot) = store
                .buckets_mut(list)
                .and_then(|b| b.get_mut(created.completion()).task_mut(real))
            {
                *slot = created;
            }
        }
        drop(store);
        tracing::info!(%temp, %real, present, "task identity rewritten");
        self.emit(MutationEvent::IdentityRewritten {
            temp: *temp.as_uuid(),
            real: *real.as_uuid(),
        });
    }
}

fn task_mut(
    store: &mut EntityStore,
    list: TaskListId,
    task: TaskId,
) -> Result<&mut Task, MutationError> {
    let buckets = store
        .buckets_mut(list)
        .ok_or(MutationError::ListNotFound(list))?;
    let completion = buckets
        .locate(task)
        .ok_or(MutationError::TaskNotFound(task))?;
    buckets
        .get_mut(completion)
        .task_mut(task)
        .ok_or(MutationError::TaskNotFound(task))
}

fn remove_task(store: &mut EntityStore, list: TaskListId, task: TaskId) {
    let list = store.canonical_list(list);
    let task = store.canonical_task(task);
    if let Some(buckets) = store.buckets_mut(list) {
        if let Some(completion) = buckets.locate(task) {
            buckets.get_mut(completion).take(task);
        }
    }
}

/// Puts a removed task back unless something already re-added it.
fn reinsert_task(
    store: &mut EntityStore,
    list: TaskListId,
    task: Task,
    completion: Completion,
    position: Option<usize>,
) {
    let list = store.canonical_list(list);
    let id = store.canonical_task(task.id());
    let Some(buckets) = store.buckets_mut(list) else {
        return;
    };
    if buckets.locate(id).is_some() {
        return;
    }
    buckets
        .get_mut(completion)
        .insert_at(task.with_id(id), position);
}

/// Withdraws an edit's label and due date writes. A field is put back only
/// while the edit is still its newest unsettled write.
fn restore_fields(store: &mut EntityStore, list: TaskListId, task: TaskId, mutation: MutationId) {
    let label = store.revert_write(*task.as_uuid(), Field::TaskLabel, mutation);
    let due_date = store.revert_write(*task.as_uuid(), Field::TaskDueDate, mutation);
    let list = store.canonical_list(list);
    let task = store.canonical_task(task);
    let Ok(slot) = task_mut(store, list, task) else {
        return;
    };
    if let Some(FieldValue::Text(label)) = label {
        slot.set_label(label);
    }
    if let Some(FieldValue::Date(due_date)) = due_date {
        *slot = slot.clone().scheduled(due_date);
    }
}

/// Moves a toggled task back if it is still where the toggle put it.
fn untoggle(
    store: &mut EntityStore,
    list: TaskListId,
    task: TaskId,
    from: Completion,
    position: Option<usize>,
) {
    let list = store.canonical_list(list);
    let task = store.canonical_task(task);
    let Some(buckets) = store.buckets_mut(list) else {
        return;
    };
    let to = from.toggled();
    if buckets.locate(task) != Some(to) {
        return;
    }
    if let Some((mut moved, _)) = buckets.get_mut(to).take(task) {
        moved.set_completed(from == Completion::Complete);
        buckets.get_mut(from).insert_at(moved, position);
    }
}
