//! Persistent focus timer
//!
//! The timer survives reloads and restarts by persisting a snapshot together
//! with the instant it was taken, and reconciling every read against the
//! wall clock.

mod machine;
mod state;
mod view;

pub use machine::{DurationBounds, SessionSink, TimerEvent, TimerMachine};
pub use state::{TimerPhase, TimerSnapshot};
pub use view::{format_clock, format_duration, TimerView};
