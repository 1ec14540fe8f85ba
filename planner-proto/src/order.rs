//! Order entries and relative positions.
//!
//! Ordering is carried separately from entity payloads: the server returns a
//! list of `{ id, orderIndex }` pairs per collection. An `orderIndex` of `-1`
//! marks an entry the server has not positioned yet. That sentinel exists
//! only on the wire; in memory it is `None`.

use serde::{Deserialize, Serialize};

/// Position of a moved entry relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    /// Place immediately before the anchor.
    Before,
    /// Place immediately after the anchor.
    After,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Before => write!(f, "Before"),
            Self::After => write!(f, "After"),
        }
    }
}

/// One element of an order sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry<I> {
    /// Id of the ordered entity.
    pub id: I,
    /// Zero-based index, or `None` when the entity is not positioned.
    #[serde(with = "order_index")]
    pub order_index: Option<u32>,
}

impl<I> OrderEntry<I> {
    /// Creates a positioned entry.
    pub const fn new(id: I, order_index: u32) -> Self {
        Self {
            id,
            order_index: Some(order_index),
        }
    }

    /// Creates an entry without a position.
    pub const fn unpositioned(id: I) -> Self {
        Self {
            id,
            order_index: None,
        }
    }
}

/// Body of `PATCH /taskLists/move/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveListBody<I> {
    /// Anchor list id.
    pub target_id: I,
    /// Placement relative to the anchor.
    pub position: Position,
}

/// Body of `PATCH /{listId}/tasks/move/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskBody<I> {
    /// Anchor task id.
    pub target_task_id: I,
    /// Placement relative to the anchor.
    pub pos: Position,
}

/// Serde adapter mapping `Option<u32>` to the `-1` wire sentinel.
mod order_index {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const UNPOSITIONED: i64 = -1;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(index) => serializer.serialize_i64(i64::from(*index)),
            None => serializer.serialize_i64(UNPOSITIONED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw == UNPOSITIONED {
            return Ok(None);
        }
        u32::try_from(raw)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("orderIndex out of range: {raw}")))
    }
}
