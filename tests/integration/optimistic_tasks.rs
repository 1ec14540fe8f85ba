//! End-to-end tests for optimistic task mutations.
//!
//! Drives the planner against the in-memory task store and checks the store
//! both right after a mutation is issued (the optimistic patch) and after it
//! settles (reconciliation or rollback).

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use planner::engine::{EngineOptions, MutationError, MutationEvent, MutationKind, Planner};
use planner::remote::RemoteError;
use planner::remote::memory::InMemoryRemote;
use planner::view::{Filter, SortMode};
use planner_proto::order::Position;
use planner_proto::route::Route;
use planner_proto::task::{Completion, DueDate, NewTask, Task, TaskEdit, TaskId, TaskListId};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_task(label: &str) -> NewTask {
    NewTask {
        label: label.to_string(),
        completed: false,
        due_date: None,
    }
}

/// Seeds one list with `open` incomplete and `done` completed tasks and loads
/// it into a fresh planner.
async fn setup(
    open: &[&str],
    done: &[&str],
) -> (
    Planner<InMemoryRemote>,
    mpsc::Receiver<MutationEvent>,
    TaskListId,
    Vec<TaskId>,
) {
    let remote = InMemoryRemote::new();
    let list = remote.seed_list("Inbox");
    let mut ids = Vec::new();
    for label in open {
        ids.push(remote.seed_task(list, new_task(label)).unwrap());
    }
    for label in done {
        let task = NewTask {
            completed: true,
            ..new_task(label)
        };
        ids.push(remote.seed_task(list, task).unwrap());
    }
    let (planner, events) = Planner::new(remote, &EngineOptions::default());
    planner.load_lists().await.unwrap();
    planner.load_tasks(list).await.unwrap();
    (planner, events, list, ids)
}

fn labels(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(Task::label).collect()
}

fn order_of(planner: &Planner<InMemoryRemote>, list: TaskListId, completion: Completion) -> Vec<TaskId> {
    planner.read(|s| s.bucket(list, completion).unwrap().order().ids().collect())
}

fn drain(events: &mut mpsc::Receiver<MutationEvent>) -> Vec<MutationEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_shows_task_at_end_before_the_server_answers() {
    let (planner, _events, list, _) = setup(&["a", "b"], &[]).await;

    let (temp, pending) = planner.create_task(list, new_task("c")).unwrap();
    planner.read(|s| {
        let bucket = s.bucket(list, Completion::Incomplete).unwrap();
        assert_eq!(bucket.order().order_index(temp), Some(2));
        assert!(s.is_pending(temp.as_uuid()));
    });
    assert!(!pending.is_settled());

    let real = pending.settled().await.unwrap();
    assert_ne!(real, temp);
}

#[tokio::test]
async fn identity_rewrite_preserves_position() {
    let (planner, _events, list, _) = setup(&["a", "b"], &[]).await;

    let (temp, pending) = planner.create_task(list, new_task("c")).unwrap();
    let position = planner.read(|s| {
        s.bucket(list, Completion::Incomplete)
            .unwrap()
            .order()
            .position(temp)
    });
    let real = pending.settled().await.unwrap();

    planner.read(|s| {
        let bucket = s.bucket(list, Completion::Incomplete).unwrap();
        assert_eq!(bucket.order().position(real), position);
        assert!(!bucket.order().contains(temp));
        assert!(bucket.task(temp).is_none());
        assert_eq!(bucket.task(real).map(Task::label), Some("c"));
        // The temporary id still addresses the task.
        assert_eq!(s.canonical_task(temp), real);
        assert!(!s.is_pending(real.as_uuid()));
    });
    let server = planner.remote().tasks_in_order(list, Completion::Incomplete);
    assert_eq!(server.last().map(Task::id), Some(real));
}

#[tokio::test]
async fn failed_create_leaves_no_trace() {
    let (planner, mut events, list, _) = setup(&[], &[]).await;
    planner.remote().fail_next(1);

    let (temp, pending) = planner
        .create_task(list, new_task("Buy milk"))
        .unwrap();
    planner.read(|s| {
        let bucket = s.bucket(list, Completion::Incomplete).unwrap();
        assert_eq!(bucket.order().order_index(temp), Some(0));
        assert!(bucket.task(temp).is_some());
    });

    let err = pending.settled().await.unwrap_err();
    assert!(matches!(
        err,
        MutationError::Remote(RemoteError::Status { status: 500, .. })
    ));
    planner.read(|s| {
        for completion in [Completion::Incomplete, Completion::Complete] {
            let bucket = s.bucket(list, completion).unwrap();
            assert!(bucket.is_empty());
            assert!(bucket.order().is_empty());
        }
        assert!(!s.has_pending());
    });
    assert!(
        planner
            .visible_tasks(list, Filter::All, SortMode::Custom)
            .is_empty()
    );

    let events = drain(&mut events);
    assert!(matches!(
        events.as_slice(),
        [MutationEvent::RolledBack {
            kind: MutationKind::CreateTask,
            ..
        }]
    ));
}

#[tokio::test]
async fn offline_create_rolls_back_with_transport_error() {
    let (planner, _events, list, _) = setup(&["a"], &[]).await;
    planner.remote().set_offline(true);

    let (_, pending) = planner.create_task(list, new_task("b")).unwrap();
    let err = pending.settled().await.unwrap_err();
    assert!(matches!(err, MutationError::Remote(RemoteError::Transport(_))));
    let visible = planner.visible_tasks(list, Filter::All, SortMode::Custom);
    assert_eq!(labels(&visible), vec!["a"]);
}

// ---------------------------------------------------------------------------
// Toggle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn toggle_moves_task_to_end_of_completed_view() {
    let (planner, _events, list, ids) = setup(&["a", "b", "c"], &["done"]).await;
    let b = ids[1];

    let pending = planner.toggle_completion(list, b).unwrap();
    let incomplete = planner.visible_tasks(list, Filter::Incomplete, SortMode::Custom);
    assert_eq!(labels(&incomplete), vec!["a", "c"]);
    let complete = planner.visible_tasks(list, Filter::Completed, SortMode::Custom);
    assert_eq!(labels(&complete), vec!["done", "b"]);
    assert!(complete[1].completed());

    pending.settled().await.unwrap();
    let complete = planner.visible_tasks(list, Filter::Completed, SortMode::Custom);
    assert_eq!(labels(&complete), vec!["done", "b"]);
    let server = planner.remote().tasks_in_order(list, Completion::Complete);
    assert_eq!(labels(&server), vec!["done", "b"]);
}

// ---------------------------------------------------------------------------
// Rollback restores the pre-mutation state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rollback_restores_state_for_every_task_mutation() {
    let (planner, _events, list, ids) = setup(&["a", "b", "c"], &["x", "y"]).await;
    let before = planner.snapshot();

    planner.remote().fail_next(1);
    let edit = TaskEdit {
        label: "renamed".to_string(),
        due_date: Some(DueDate::new("2024-05-01T00:00:00Z")),
    };
    let result = planner.update_task(list, ids[0], edit).unwrap().settled().await;
    assert!(result.is_err());
    assert_eq!(planner.snapshot(), before, "update");

    planner.remote().fail_next(1);
    let result = planner.delete_task(list, ids[1]).unwrap().settled().await;
    assert!(result.is_err());
    assert_eq!(planner.snapshot(), before, "delete");

    planner.remote().fail_next(1);
    let result = planner.toggle_completion(list, ids[1]).unwrap().settled().await;
    assert!(result.is_err());
    assert_eq!(planner.snapshot(), before, "toggle");

    planner.remote().fail_next(1);
    let pending = planner
        .move_task(list, ids[2], ids[0], Position::Before)
        .unwrap();
    assert_eq!(
        order_of(&planner, list, Completion::Incomplete),
        vec![ids[2], ids[0], ids[1]]
    );
    assert!(pending.settled().await.is_err());
    assert_eq!(planner.snapshot(), before, "move");

    planner.remote().fail_next(1);
    let pending = planner.clear_completed(list).unwrap();
    assert!(order_of(&planner, list, Completion::Complete).is_empty());
    assert!(pending.settled().await.is_err());
    assert_eq!(planner.snapshot(), before, "clear completed");
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_mutation_sends_exactly_one_request() {
    let (planner, _events, list, ids) = setup(&["a", "b"], &["done"]).await;
    let baseline = planner.remote().request_count();

    let (_, created) = planner.create_task(list, new_task("c")).unwrap();
    created.settled().await.unwrap();
    let edit = TaskEdit {
        label: "A".to_string(),
        due_date: None,
    };
    planner.update_task(list, ids[0], edit).unwrap().settled().await.unwrap();
    planner
        .move_task(list, ids[1], ids[0], Position::Before)
        .unwrap()
        .settled()
        .await
        .unwrap();
    planner.toggle_completion(list, ids[0]).unwrap().settled().await.unwrap();
    planner.clear_completed(list).unwrap().settled().await.unwrap();
    planner.delete_task(list, ids[1]).unwrap().settled().await.unwrap();

    let requests = planner.remote().requests();
    let issued = &requests[baseline..];
    assert_eq!(issued.len(), 6);
    assert_eq!(issued[0], Route::CreateTask(list));
    assert_eq!(issued[1], Route::UpdateTask { list, task: ids[0] });
    assert_eq!(issued[2], Route::MoveTask { list, task: ids[1] });
    assert_eq!(issued[3], Route::ToggleCompletion { list, task: ids[0] });
    assert_eq!(issued[4], Route::ClearCompleted(list));
    assert_eq!(issued[5], Route::DeleteTask { list, task: ids[1] });

    let visible = planner.visible_tasks(list, Filter::All, SortMode::Custom);
    assert_eq!(labels(&visible), vec!["c"]);
}

#[tokio::test]
async fn rejected_mutations_send_nothing() {
    let (planner, _events, list, ids) = setup(&["a"], &["done"]).await;
    let baseline = planner.remote().request_count();

    assert!(matches!(
        planner.create_task(list, new_task("  ")),
        Err(MutationError::Validation(_))
    ));
    assert_eq!(
        planner
            .move_task(list, ids[0], ids[0], Position::After)
            .unwrap_err(),
        MutationError::SelfAnchored
    );
    // The anchor lives in the other partition.
    assert!(matches!(
        planner.move_task(list, ids[0], ids[1], Position::After),
        Err(MutationError::Order(_))
    ));
    let missing = TaskId::new();
    assert_eq!(
        planner.toggle_completion(list, missing).unwrap_err(),
        MutationError::TaskNotFound(missing)
    );
    let unknown = TaskListId::new();
    assert_eq!(
        planner.clear_completed(unknown).unwrap_err(),
        MutationError::ListNotFound(unknown)
    );

    assert_eq!(planner.remote().request_count(), baseline);
    planner.read(|s| assert!(!s.has_pending()));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_report_settlement_and_identity() {
    let (planner, mut events, list, _) = setup(&[], &[]).await;

    let (temp, pending) = planner.create_task(list, new_task("a")).unwrap();
    let mutation = pending.id();
    let real = pending.settled().await.unwrap();

    let events = drain(&mut events);
    assert_eq!(
        events,
        vec![
            MutationEvent::IdentityRewritten {
                temp: *temp.as_uuid(),
                real: *real.as_uuid(),
            },
            MutationEvent::Settled {
                mutation,
                kind: MutationKind::CreateTask,
            },
        ]
    );
}

#[tokio::test]
async fn date_sort_view_reflects_optimistic_edit() {
    let (planner, _events, list, ids) = setup(&["a", "b"], &[]).await;
    let edit = TaskEdit {
        label: "b".to_string(),
        due_date: Some(DueDate::new("2024-01-01T00:00:00Z")),
    };
    let pending = planner.update_task(list, ids[1], edit).unwrap();

    let visible = planner.visible_tasks(list, Filter::All, SortMode::ByDate);
    assert_eq!(labels(&visible), vec!["b", "a"]);
    pending.settled().await.unwrap();

    let server = planner.remote().tasks_in_order(list, Completion::Incomplete);
    assert!(server[1].due_date().is_some());
}
