//! Memphis - persistent focus timer, task list and daily goals
//!
//! This library provides the core of the Memphis focus hub: a wall-clock
//! reconciled timer, the task/session/goal data layer, an offline action
//! queue, and the local HTTP API that front-ends drive it through.

pub mod api;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod hub;
pub mod logging;
pub mod model;
pub mod offline;
pub mod store;
pub mod timer;
