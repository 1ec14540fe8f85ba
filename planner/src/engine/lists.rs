//! Task list mutations: create, rename, delete, move.

use planner_proto::order::Position;
use planner_proto::task::{TaskList, TaskListId, validate_list_name};

use super::identity::Identity;
use super::{
    MutationError, MutationEvent, MutationKind, PendingMutation, Planner, Rollback, Shared,
    restore_sequence,
};
use crate::remote::RemoteStore;
use crate::store::{EntityStore, Field, FieldValue};

impl<R: RemoteStore> Planner<R> {
    /// Creates a list at the end of the list order under a temporary id.
    ///
    /// Tasks may be created in the new list right away; their requests wait
    /// until the list has its server id.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Validation`] for an empty name.
    pub fn create_list(
        &self,
        name: &str,
    ) -> Result<(TaskListId, PendingMutation<TaskListId>), MutationError> {
        validate_list_name(name)?;
        let optimistic = TaskList {
            id: TaskListId::new(),
            name: name.to_string(),
        };
        let temp = optimistic.id;
        {
            let mut store = self.shared.store.write();
            store.insert_list(optimistic.clone(), None);
            store.mark_pending(&[*temp.as_uuid()]);
        }
        let identity = self.shared.identities.register(*temp.as_uuid());
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            let id = store.canonical_list(temp);
            store.take_list(id);
        });
        let name = name.to_string();

        let pending = self.launch(
            self.next_id(),
            MutationKind::CreateList,
            vec![*temp.as_uuid()],
            rollback,
            move |shared| async move {
                match shared.call(shared.remote.create_task_list(&name)).await {
                    Ok(created) => {
                        let real = created.id;
                        shared.reconcile_created_list(&optimistic, created);
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

    /// Renames a list.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Validation`] for an empty name or
    /// [`MutationError::ListNotFound`].
    pub fn rename_list(
        &self,
        list: TaskListId,
        name: &str,
    ) -> Result<PendingMutation<()>, MutationError> {
        validate_list_name(name)?;
        let id = self.next_id();
        let list = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let entry = store
                .list_mut(list)
                .ok_or(MutationError::ListNotFound(list))?;
            let previous = std::mem::replace(&mut entry.name, name.to_string());
            store.record_write(
                *list.as_uuid(),
                Field::ListName,
                id,
                FieldValue::Text(previous),
            );
            store.mark_pending(&[*list.as_uuid()]);
            list
        };
        let name = name.to_string();
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            let previous = store.revert_write(*list.as_uuid(), Field::ListName, id);
            let current = store.canonical_list(list);
            if let (Some(FieldValue::Text(previous)), Some(entry)) =
                (previous, store.list_mut(current))
            {
                entry.name = previous;
            }
        });

        Ok(self.launch(
            id,
            MutationKind::RenameList,
            vec![*list.as_uuid()],
            rollback,
            move |shared| async move {
                let list = shared.resolve_list(list).await?;
                shared
                    .call(shared.remote.rename_task_list(list, &name))
                    .await
            },
        ))
    }

    /// Deletes a list with all of its tasks.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::ListNotFound`].
    pub fn delete_list(&self, list: TaskListId) -> Result<PendingMutation<()>, MutationError> {
        let (list, removed) = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let removed = store
                .take_list(list)
                .ok_or(MutationError::ListNotFound(list))?;
            store.mark_pending(&[*list.as_uuid()]);
            (list, removed)
        };
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            let mut removed = removed;
            let id = store.canonical_list(removed.list.id);
            if store.task_list(id).is_some() {
                return;
            }
            removed.list.id = id;
            store.restore_list(removed);
        });

        Ok(self.launch(
            self.next_id(),
            MutationKind::DeleteList,
            vec![*list.as_uuid()],
            rollback,
            move |shared| async move {
                match shared.resolve_list(list).await {
                    Ok(list) => shared.call(shared.remote.delete_task_list(list)).await,
                    Err(MutationError::Unconfirmed(_)) => Ok(()),
                    Err(error) => Err(error),
                }
            },
        ))
    }

    /// Moves a list before or after another list.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::SelfAnchored`] when `list == target` and
    /// [`MutationError::Order`] when either id is not in the list order.
    /// Nothing is patched or sent.
    pub fn move_list(
        &self,
        list: TaskListId,
        target: TaskListId,
        position: Position,
    ) -> Result<PendingMutation<()>, MutationError> {
        let (list, target, before, after) = {
            let mut store = self.shared.store.write();
            let list = store.canonical_list(list);
            let target = store.canonical_list(target);
            if list == target {
                return Err(MutationError::SelfAnchored);
            }
            let order = store.list_order_mut();
            let before = order.clone();
            order.move_relative(list, target, position)?;
            let after = order.clone();
            store.mark_pending(&[*list.as_uuid()]);
            (list, target, before, after)
        };
        let rollback: Rollback = Box::new(move |store: &mut EntityStore| {
            let current = store.canonical_list(list);
            restore_sequence(store.list_order_mut(), (list, current), &before, &after);
        });

        Ok(self.launch(
            self.next_id(),
            MutationKind::MoveList,
            vec![*list.as_uuid()],
            rollback,
            move |shared| async move {
                let list = shared.resolve_list(list).await?;
                let target = shared.resolve_list(target).await?;
                shared
                    .call(shared.remote.move_task_list(list, target, position))
                    .await
            },
        ))
    }
}

impl<R: RemoteStore> Shared<R> {
    /// Moves a created list, with its tasks, from its temporary id to the
    /// server id. The server's name is taken only if the list was not renamed
    /// in the meantime.
    fn reconcile_created_list(&self, optimistic: &TaskList, created: TaskList) {
        let temp = optimistic.id;
        let real = created.id;
        let mut store = self.store.write();
        let untouched = store.task_list(temp) == Some(optimistic);
        store.rewrite_list_id(temp, real);
        if untouched {
            if let Some(entry) = store.list_mut(real) {
                entry.name = created.name;
            }
        }
        drop(store);
        tracing::info!(%temp, %real, "task list identity rewritten");
        self.emit(MutationEvent::IdentityRewritten {
            temp: *temp.as_uuid(),
            real: *real.as_uuid(),
        });
    }
}
