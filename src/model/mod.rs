//! Data model shared by the store, the timer and the data layer

pub mod session;
pub mod task;

pub use session::{date_key, validate_date_key, DailyGoal, FocusSession, SessionInput};
pub use task::{Priority, Task, TaskId, TaskInput, TaskUpdate};
