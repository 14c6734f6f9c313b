//! Convenience re-exports of the scheduler's public surface.

pub use crate::config::SchedulerConfig;
pub use crate::error::{SchedulerError, SchedulerResult};
pub use crate::scheduler::TaskScheduler;
pub use crate::store::{ScheduledTask, TaskId, TaskInfo, TaskParam, TaskStore};
