//! Task planner client core.
//!
//! Keeps a local copy of task lists and tasks, applies every edit to it
//! immediately, and reconciles with the remote task store in the background.
//! Failed requests roll their edit back.

pub mod config;
pub mod engine;
pub mod order;
pub mod preferences;
pub mod remote;
pub mod store;
pub mod view;
