//! Task and task-list types for the planner wire format.
//!
//! A [`Task`] is a sum type over the presence of a due date. On the wire the
//! variant is discriminated by whether the `dueDate` field is present; inside
//! the program every reader of the due date matches on the variant.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered identifier (UUID v7).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[doc = concat!("Creates a `", stringify!($name), "` from an existing UUID.")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID value.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use uuid_id;

uuid_id!(
    /// Identifier of a task list.
    TaskListId
);

uuid_id!(
    /// Identifier of a task. Client-side temporary ids are UUID v7 so they
    /// sort by creation time before the server assigns a real one.
    TaskId
);

/// Errors raised when user input does not satisfy the data model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Task label is empty or whitespace.
    #[error("task label cannot be empty")]
    EmptyLabel,
    /// Task list name is empty or whitespace.
    #[error("task list name cannot be empty")]
    EmptyListName,
    /// Tag name is empty or whitespace.
    #[error("tag name cannot be empty")]
    EmptyTagName,
    /// Tag name exceeds the maximum length.
    #[error("tag name too long: {actual} characters (max {max})")]
    TagNameTooLong {
        /// Length of the rejected name in characters.
        actual: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// A colour component is outside its allowed range.
    #[error("colour component {component} out of range: {value}")]
    ColourOutOfRange {
        /// Which component (`l`, `c` or `h`).
        component: char,
        /// The rejected value.
        value: f64,
    },
}

/// Rejects empty or whitespace-only task labels.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyLabel`] if the label has no visible content.
pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    Ok(())
}

/// Rejects empty or whitespace-only task list names.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyListName`] if the name has no visible content.
pub fn validate_list_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyListName);
    }
    Ok(())
}

/// A named task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    /// List identifier.
    pub id: TaskListId,
    /// Display name.
    pub name: String,
}

/// Completion partition of a list's tasks.
///
/// The store keeps incomplete and complete tasks in separate collections,
/// each with its own order sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Completion {
    /// Tasks not yet done.
    Incomplete,
    /// Tasks marked done.
    Complete,
}

impl Completion {
    /// Returns the partition a task with the given flag belongs to.
    #[must_use]
    pub const fn of(completed: bool) -> Self {
        if completed {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }

    /// Returns the opposite partition.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Incomplete => Self::Complete,
            Self::Complete => Self::Incomplete,
        }
    }

    /// Path segment used by the REST routes.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// An ISO-8601 due date as received from or sent to the server.
///
/// The raw text is kept verbatim. [`instant`](Self::instant) parses it on
/// demand; text that does not parse is treated as "no date" when sorting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DueDate(String);

impl DueDate {
    /// Wraps raw due-date text without validating it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Formats an instant as an RFC 3339 UTC string with millisecond precision.
    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Returns the raw text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the due date, returning `None` if the text is not RFC 3339.
    #[must_use]
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl std::fmt::Display for DueDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A task, discriminated by whether it carries a due date.
///
/// Adding or removing the date is a variant transition
/// ([`scheduled`](Self::scheduled)), never a field write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaskWire", into = "TaskWire")]
pub enum Task {
    /// A task with a due date.
    WithDate {
        /// Task identifier.
        id: TaskId,
        /// Display label.
        label: String,
        /// Completion flag.
        completed: bool,
        /// When the task is due.
        due_date: DueDate,
    },
    /// A task without a due date.
    WithoutDate {
        /// Task identifier.
        id: TaskId,
        /// Display label.
        label: String,
        /// Completion flag.
        completed: bool,
    },
}

impl Task {
    /// Builds a task from its parts, choosing the variant from `due_date`.
    #[must_use]
    pub fn new(id: TaskId, label: String, completed: bool, due_date: Option<DueDate>) -> Self {
        match due_date {
            Some(due_date) => Self::WithDate {
                id,
                label,
                completed,
                due_date,
            },
            None => Self::WithoutDate {
                id,
                label,
                completed,
            },
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        match self {
            Self::WithDate { id, .. } | Self::WithoutDate { id, .. } => *id,
        }
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::WithDate { label, .. } | Self::WithoutDate { label, .. } => label,
        }
    }

    /// Returns the completion flag.
    #[must_use]
    pub const fn completed(&self) -> bool {
        match self {
            Self::WithDate { completed, .. } | Self::WithoutDate { completed, .. } => *completed,
        }
    }

    /// Returns the due date of a [`Task::WithDate`], or `None`.
    #[must_use]
    pub const fn due_date(&self) -> Option<&DueDate> {
        match self {
            Self::WithDate { due_date, .. } => Some(due_date),
            Self::WithoutDate { .. } => None,
        }
    }

    /// Returns the partition this task belongs to.
    #[must_use]
    pub const fn completion(&self) -> Completion {
        Completion::of(self.completed())
    }

    /// Returns the same task under a different identifier.
    #[must_use]
    pub fn with_id(mut self, new_id: TaskId) -> Self {
        match &mut self {
            Self::WithDate { id, .. } | Self::WithoutDate { id, .. } => *id = new_id,
        }
        self
    }

    /// Replaces the label.
    pub fn set_label(&mut self, new_label: String) {
        match self {
            Self::WithDate { label, .. } | Self::WithoutDate { label, .. } => *label = new_label,
        }
    }

    /// Replaces the completion flag.
    pub const fn set_completed(&mut self, value: bool) {
        match self {
            Self::WithDate { completed, .. } | Self::WithoutDate { completed, .. } => {
                *completed = value;
            }
        }
    }

    /// Transitions to [`Task::WithDate`] or [`Task::WithoutDate`].
    #[must_use]
    pub fn scheduled(self, due_date: Option<DueDate>) -> Self {
        match self {
            Self::WithDate {
                id,
                label,
                completed,
                ..
            }
            | Self::WithoutDate {
                id,
                label,
                completed,
            } => Self::new(id, label, completed, due_date),
        }
    }
}

/// JSON shape of a task: `dueDate` is present only for dated tasks.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskWire {
    id: TaskId,
    label: String,
    completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<DueDate>,
}

impl From<TaskWire> for Task {
    fn from(wire: TaskWire) -> Self {
        Self::new(wire.id, wire.label, wire.completed, wire.due_date)
    }
}

impl From<Task> for TaskWire {
    fn from(task: Task) -> Self {
        match task {
            Task::WithDate {
                id,
                label,
                completed,
                due_date,
            } => Self {
                id,
                label,
                completed,
                due_date: Some(due_date),
            },
            Task::WithoutDate {
                id,
                label,
                completed,
            } => Self {
                id,
                label,
                completed,
                due_date: None,
            },
        }
    }
}

/// Body of `POST /{listId}/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Display label.
    pub label: String,
    /// Initial completion flag.
    pub completed: bool,
    /// Optional due date; omitted from the JSON when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
}

/// Body of `PATCH /{listId}/tasks/{taskId}`.
///
/// `dueDate` is always sent; `null` removes the date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEdit {
    /// New label.
    pub label: String,
    /// New due date, or `None` to make the task undated.
    pub due_date: Option<DueDate>,
}

/// Body of `PUT /taskLists` and `PATCH /taskLists/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListName {
    /// List name.
    pub name: String,
}
