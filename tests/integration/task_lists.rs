//! End-to-end tests for task list mutations and queries.
//!
//! Covers list create/rename/delete/move against the in-memory task store,
//! tasks created inside a list that is itself still being created, and the
//! query state a view uses to render loading and error affordances.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use planner::engine::{EngineOptions, MutationError, Planner};
use planner::remote::memory::InMemoryRemote;
use planner::store::{Query, QueryState};
use planner::view::{Filter, SortMode};
use planner_proto::order::Position;
use planner_proto::route::Route;
use planner_proto::task::{Completion, NewTask, Task, TaskListId};

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

async fn setup(names: &[&str]) -> (Planner<InMemoryRemote>, Vec<TaskListId>) {
    let remote = InMemoryRemote::new();
    let ids: Vec<TaskListId> = names.iter().map(|n| remote.seed_list(n)).collect();
    let (planner, _events) = Planner::new(remote, &EngineOptions::default());
    planner.load_lists().await.unwrap();
    (planner, ids)
}

fn names(planner: &Planner<InMemoryRemote>) -> Vec<String> {
    planner.read(|s| s.lists_in_order().iter().map(|l| l.name.clone()).collect())
}

fn server_names(planner: &Planner<InMemoryRemote>) -> Vec<String> {
    planner
        .remote()
        .lists_in_order()
        .into_iter()
        .map(|l| l.name)
        .collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_lists_follows_server_order() {
    let (planner, ids) = setup(&["Work", "Home", "Errands"]).await;
    assert_eq!(names(&planner), vec!["Work", "Home", "Errands"]);
    planner.read(|s| {
        assert_eq!(s.query_state(Query::Lists), Some(&QueryState::Ready));
        assert_eq!(s.query_state(Query::Tasks(ids[0])), None);
    });
}

#[tokio::test]
async fn failed_task_query_is_marked_and_retryable() {
    let (planner, ids) = setup(&["Work"]).await;
    planner.remote().fail_next(1);

    let err = planner.load_tasks(ids[0]).await.unwrap_err();
    assert!(matches!(err, MutationError::Remote(_)));
    planner.read(|s| {
        assert!(matches!(
            s.query_state(Query::Tasks(ids[0])),
            Some(QueryState::Failed(_))
        ));
    });

    planner.load_tasks(ids[0]).await.unwrap();
    planner.read(|s| {
        assert_eq!(s.query_state(Query::Tasks(ids[0])), Some(&QueryState::Ready));
    });
}

#[tokio::test]
async fn loading_tasks_of_unknown_list_sends_nothing() {
    let (planner, _) = setup(&[]).await;
    let baseline = planner.remote().request_count();
    let unknown = TaskListId::new();
    assert_eq!(
        planner.load_tasks(unknown).await.unwrap_err(),
        MutationError::ListNotFound(unknown)
    );
    assert_eq!(planner.remote().request_count(), baseline);
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_list_appends_and_rewrites_identity() {
    let (planner, _) = setup(&["Work"]).await;

    let (temp, pending) = planner.create_list("Home").unwrap();
    assert_eq!(names(&planner), vec!["Work", "Home"]);
    planner.read(|s| assert!(s.is_pending(temp.as_uuid())));

    let real = pending.settled().await.unwrap();
    planner.read(|s| {
        assert_eq!(s.list_order().position(real), Some(1));
        assert!(s.list_order().is_contiguous());
        assert!(!s.has_pending());
    });
    assert_eq!(server_names(&planner), vec!["Work", "Home"]);
}

#[tokio::test]
async fn task_created_in_pending_list_lands_in_the_server_list() {
    let (planner, _) = setup(&[]).await;

    let (temp_list, list_created) = planner.create_list("Groceries").unwrap();
    let (_, task_created) = planner.create_task(temp_list, new_task("Eggs")).unwrap();
    let visible = planner.visible_tasks(temp_list, Filter::All, SortMode::Custom);
    assert_eq!(visible.iter().map(Task::label).collect::<Vec<_>>(), vec!["Eggs"]);

    let list = list_created.settled().await.unwrap();
    let task = task_created.settled().await.unwrap();

    assert!(
        planner
            .remote()
            .requests()
            .contains(&Route::CreateTask(list))
    );
    let server = planner.remote().tasks_in_order(list, Completion::Incomplete);
    assert_eq!(server.iter().map(Task::id).collect::<Vec<_>>(), vec![task]);
    planner.read(|s| {
        assert_eq!(s.canonical_list(temp_list), list);
        assert!(s.task(list, task).is_some());
        assert!(s.task(temp_list, task).is_some());
    });
}

#[tokio::test]
async fn failed_list_creation_discards_its_tasks() {
    let (planner, _) = setup(&["Work"]).await;
    planner.remote().fail_next(1);

    let (temp_list, list_created) = planner.create_list("Doomed").unwrap();
    let (_, task_created) = planner.create_task(temp_list, new_task("never")).unwrap();

    assert!(list_created.settled().await.is_err());
    assert_eq!(
        task_created.settled().await.unwrap_err(),
        MutationError::Unconfirmed(*temp_list.as_uuid())
    );
    assert_eq!(names(&planner), vec!["Work"]);
    planner.read(|s| {
        assert!(s.buckets(temp_list).is_none());
        assert!(!s.has_pending());
    });
    // Only the failed list creation reached the server.
    assert_eq!(
        planner.remote().requests().last(),
        Some(&Route::CreateTaskList)
    );
}

// ---------------------------------------------------------------------------
// Rename, delete, move
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rename_round_trip_and_rollback() {
    let (planner, ids) = setup(&["Work"]).await;

    planner
        .rename_list(ids[0], "Office")
        .unwrap()
        .settled()
        .await
        .unwrap();
    assert_eq!(names(&planner), vec!["Office"]);
    assert_eq!(server_names(&planner), vec!["Office"]);

    planner.remote().fail_next(1);
    let pending = planner.rename_list(ids[0], "Desk").unwrap();
    assert_eq!(names(&planner), vec!["Desk"]);
    assert!(pending.settled().await.is_err());
    assert_eq!(names(&planner), vec!["Office"]);
}

#[tokio::test]
async fn failed_delete_restores_list_tasks_and_position() {
    let remote = InMemoryRemote::new();
    let work = remote.seed_list("Work");
    let home = remote.seed_list("Home");
    remote.seed_task(home, new_task("Vacuum")).unwrap();
    let (planner, _events) = Planner::new(remote, &EngineOptions::default());
    planner.load_lists().await.unwrap();
    planner.load_tasks(home).await.unwrap();
    let before = planner.snapshot();

    planner.remote().fail_next(1);
    let pending = planner.delete_list(work).unwrap();
    assert_eq!(names(&planner), vec!["Home"]);
    assert!(pending.settled().await.is_err());
    assert_eq!(planner.snapshot(), before);

    planner.delete_list(home).unwrap().settled().await.unwrap();
    assert_eq!(names(&planner), vec!["Work"]);
    assert_eq!(server_names(&planner), vec!["Work"]);
}

#[tokio::test]
async fn move_list_and_rollback() {
    let (planner, ids) = setup(&["A", "B", "C"]).await;

    planner
        .move_list(ids[2], ids[0], Position::Before)
        .unwrap()
        .settled()
        .await
        .unwrap();
    assert_eq!(names(&planner), vec!["C", "A", "B"]);
    assert_eq!(server_names(&planner), vec!["C", "A", "B"]);

    let before = planner.snapshot();
    planner.remote().fail_next(1);
    let pending = planner.move_list(ids[2], ids[1], Position::After).unwrap();
    assert_eq!(names(&planner), vec!["A", "B", "C"]);
    assert!(pending.settled().await.is_err());
    assert_eq!(planner.snapshot(), before);
}

#[tokio::test]
async fn list_mutations_validate_locally() {
    let (planner, ids) = setup(&["A"]).await;
    let baseline = planner.remote().request_count();

    assert!(matches!(
        planner.rename_list(ids[0], ""),
        Err(MutationError::Validation(_))
    ));
    let unknown = TaskListId::new();
    assert_eq!(
        planner.delete_list(unknown).unwrap_err(),
        MutationError::ListNotFound(unknown)
    );
    assert!(matches!(
        planner.move_list(ids[0], unknown, Position::Before),
        Err(MutationError::Order(_))
    ));
    assert_eq!(planner.remote().request_count(), baseline);
    assert_eq!(names(&planner), vec!["A"]);
}
