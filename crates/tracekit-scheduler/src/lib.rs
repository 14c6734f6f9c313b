//! Deferred task execution at wall-clock times on a dedicated thread.
//!
//! [`TaskScheduler`] polls an ordered [`TaskStore`] from one background
//! thread and runs each due callback synchronously, exactly once. Tasks are
//! immutable; periodic work is expressed by a callback scheduling its own
//! successor, which is safe because callbacks run with the store unlocked.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::{Duration, SystemTime};
//! use tracekit_scheduler::{SchedulerConfig, TaskScheduler};
//!
//! let scheduler = TaskScheduler::new(SchedulerConfig::default())?;
//! scheduler.add(
//!     SystemTime::now() + Duration::from_secs(5),
//!     |_param| println!("warmup complete"),
//!     Arc::new("payload"),
//!     Some("warmup".to_owned()),
//! );
//! scheduler.shutdown();
//! # Ok::<(), tracekit_scheduler::SchedulerError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod prelude;
pub mod scheduler;
pub mod store;

pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::TaskScheduler;
pub use store::{ScheduledTask, TaskId, TaskInfo, TaskParam, TaskStore};
