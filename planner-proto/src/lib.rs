//! Shared wire contract for the planner REST API.
//!
//! Holds the data model exchanged with the task store (task lists, tasks,
//! order entries, tags), the route table, the JSON codec, and the tag
//! colour codec.

pub mod codec;
pub mod colour;
pub mod order;
pub mod route;
pub mod tag;
pub mod task;
