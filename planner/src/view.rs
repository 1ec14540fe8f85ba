//! Sort and filter projection of a list's tasks.
//!
//! [`project`] is a pure function of its inputs and is recomputed from
//! scratch on every store or option change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use planner_proto::task::{Completion, Task, TaskListId};

use crate::order::compare_index;
use crate::store::EntityStore;

/// Which tasks are visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Every task.
    #[default]
    All,
    /// Completed tasks only.
    Completed,
    /// Incomplete tasks only.
    Incomplete,
}

impl Filter {
    /// Whether `task` passes the filter.
    #[must_use]
    pub const fn accepts(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.completed(),
            Self::Incomplete => !task.completed(),
        }
    }
}

/// How visible tasks are ordered. Persisted as `CUSTOM`, `DATE` or `NAME`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    /// User-defined order.
    #[default]
    #[serde(rename = "CUSTOM")]
    Custom,
    /// Due date ascending, undated last.
    #[serde(rename = "DATE")]
    ByDate,
    /// Label, case-insensitive: compares lowercased labels, not
    /// locale-collated ones.
    #[serde(rename = "NAME")]
    ByName,
}

impl SortMode {
    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "CUSTOM",
            Self::ByDate => "DATE",
            Self::ByName => "NAME",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised sort mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort mode {0:?} (expected custom, date or name)")]
pub struct UnknownSortMode(pub String);

impl FromStr for SortMode {
    type Err = UnknownSortMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CUSTOM" => Ok(Self::Custom),
            "DATE" => Ok(Self::ByDate),
            "NAME" => Ok(Self::ByName),
            _ => Err(UnknownSortMode(s.to_string())),
        }
    }
}

/// A task together with its position in its partition's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRow<'a> {
    /// The task.
    pub task: &'a Task,
    /// Index in the partition's order sequence; `None` if unpositioned.
    pub order_index: Option<u32>,
}

/// Collects the rows of `list`: incomplete partition first, each partition
/// in order-sequence order, tasks without an order entry after the ordered
/// ones (by id, which is creation time for temporary ids).
#[must_use]
pub fn rows(store: &EntityStore, list: TaskListId) -> Vec<TaskRow<'_>> {
    let Some(buckets) = store.buckets(list) else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    for completion in [Completion::Incomplete, Completion::Complete] {
        let bucket = buckets.get(completion);
        let order = bucket.order();
        rows.extend(order.ids().filter_map(|id| {
            bucket.task(id).map(|task| TaskRow {
                task,
                order_index: order.order_index(id),
            })
        }));
        let mut unordered: Vec<&Task> = bucket
            .tasks()
            .filter(|t| !order.contains(t.id()))
            .collect();
        unordered.sort_by_key(|t| t.id());
        rows.extend(unordered.into_iter().map(|task| TaskRow {
            task,
            order_index: None,
        }));
    }
    rows
}

/// Filters and sorts `rows` without modifying them.
///
/// All sorts are stable: rows equal under the comparator keep their input
/// order. Custom order keeps incomplete tasks ahead of completed ones, since
/// each partition has its own index range.
#[must_use]
pub fn project<'a>(rows: &[TaskRow<'a>], filter: Filter, sort: SortMode) -> Vec<TaskRow<'a>> {
    let mut visible: Vec<TaskRow<'a>> = rows
        .iter()
        .copied()
        .filter(|row| filter.accepts(row.task))
        .collect();
    match sort {
        SortMode::Custom => visible.sort_by(|a, b| {
            a.task
                .completion()
                .cmp(&b.task.completion())
                .then_with(|| compare_index(a.order_index, b.order_index))
        }),
        SortMode::ByDate => visible.sort_by_cached_key(|row| {
            let instant = row.task.due_date().and_then(|d| d.instant());
            (instant.is_none(), instant)
        }),
        SortMode::ByName => visible.sort_by_cached_key(|row| row.task.label().to_lowercase()),
    }
    visible
}
