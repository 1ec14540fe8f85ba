//! Integration tests for the sort/filter projection.
//!
//! Builds the store through the planner and checks the rows a view renders
//! for every filter and sort mode, including how the projection follows
//! optimistic patches.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use planner::engine::{EngineOptions, Planner};
use planner::remote::memory::InMemoryRemote;
use planner::view::{self, Filter, SortMode};
use planner_proto::order::Position;
use planner_proto::task::{DueDate, NewTask, Task, TaskId, TaskListId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn task(label: &str, completed: bool, due: Option<&str>) -> NewTask {
    NewTask {
        label: label.to_string(),
        completed,
        due_date: due.map(DueDate::new),
    }
}

async fn setup(tasks: Vec<NewTask>) -> (Planner<InMemoryRemote>, TaskListId, Vec<TaskId>) {
    let remote = InMemoryRemote::new();
    let list = remote.seed_list("Inbox");
    let ids = tasks
        .into_iter()
        .map(|t| remote.seed_task(list, t).unwrap())
        .collect();
    let (planner, _events) = Planner::new(remote, &EngineOptions::default());
    planner.load_lists().await.unwrap();
    planner.load_tasks(list).await.unwrap();
    (planner, list, ids)
}

fn labels(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(Task::label).collect()
}

// ---------------------------------------------------------------------------
// Sort modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn name_sort_groups_case_insensitively_and_is_stable() {
    let (planner, list, _) = setup(vec![
        task("B", false, None),
        task("a", false, None),
        task("A", false, None),
    ])
    .await;

    let sorted = planner.visible_tasks(list, Filter::All, SortMode::ByName);
    let sorted = labels(&sorted);
    assert_eq!(sorted[2], "B");
    assert!(sorted[..2].contains(&"a") && sorted[..2].contains(&"A"));

    // Ties keep custom order: "a" was created before "A".
    assert_eq!(sorted[..2], ["a", "A"]);
}

#[tokio::test]
async fn date_sort_puts_undated_last() {
    let (planner, list, _) = setup(vec![
        task("undated", false, None),
        task("march", false, Some("2024-03-01T00:00:00Z")),
        task("january", true, Some("2024-01-15T12:00:00.000Z")),
        task("bogus", false, Some("next week")),
    ])
    .await;

    let sorted = planner.visible_tasks(list, Filter::All, SortMode::ByDate);
    assert_eq!(labels(&sorted), vec!["january", "march", "undated", "bogus"]);
}

#[tokio::test]
async fn custom_sort_lists_incomplete_before_complete() {
    let (planner, list, ids) = setup(vec![
        task("one", false, None),
        task("two", false, None),
        task("done", true, None),
    ])
    .await;

    let all = planner.visible_tasks(list, Filter::All, SortMode::Custom);
    assert_eq!(labels(&all), vec!["one", "two", "done"]);

    planner
        .move_task(list, ids[1], ids[0], Position::Before)
        .unwrap()
        .settled()
        .await
        .unwrap();
    let all = planner.visible_tasks(list, Filter::All, SortMode::Custom);
    assert_eq!(labels(&all), vec!["two", "one", "done"]);
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn filters_select_partitions() {
    let (planner, list, _) = setup(vec![
        task("open", false, None),
        task("closed", true, None),
    ])
    .await;

    let completed = planner.visible_tasks(list, Filter::Completed, SortMode::Custom);
    assert_eq!(labels(&completed), vec!["closed"]);
    let incomplete = planner.visible_tasks(list, Filter::Incomplete, SortMode::ByName);
    assert_eq!(labels(&incomplete), vec!["open"]);
}

#[tokio::test]
async fn projection_follows_optimistic_toggle() {
    let (planner, list, ids) = setup(vec![
        task("x", false, None),
        task("y", false, None),
        task("z", true, None),
    ])
    .await;

    let pending = planner.toggle_completion(list, ids[0]).unwrap();
    let incomplete = planner.visible_tasks(list, Filter::Incomplete, SortMode::Custom);
    assert_eq!(labels(&incomplete), vec!["y"]);
    let completed = planner.visible_tasks(list, Filter::Completed, SortMode::Custom);
    assert_eq!(labels(&completed), vec!["z", "x"]);
    pending.settled().await.unwrap();
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rows_carry_order_indices_and_leave_store_untouched() {
    let (planner, list, ids) = setup(vec![
        task("first", false, None),
        task("second", false, None),
        task("third", true, None),
    ])
    .await;
    let before = planner.snapshot();

    planner.read(|store| {
        let rows = view::rows(store, list);
        let indices: Vec<(TaskId, Option<u32>)> =
            rows.iter().map(|r| (r.task.id(), r.order_index)).collect();
        assert_eq!(
            indices,
            vec![(ids[0], Some(0)), (ids[1], Some(1)), (ids[2], Some(0))]
        );

        let by_name = view::project(&rows, Filter::All, SortMode::ByName);
        assert_eq!(
            by_name.iter().map(|r| r.task.label()).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
    });
    assert_eq!(planner.snapshot(), before);
    assert!(view::rows(&before, TaskListId::new()).is_empty());
}
