//! Low-overhead circular trace log for debugging concurrent pipelines.
//!
//! [`RtTraceLog`] records short diagnostic messages from arbitrarily many
//! threads with a single atomic increment on the producer side. The last
//! `capacity` entries are kept in a circular slot array and older entries
//! are overwritten in place. The log is meant for sub-microsecond-level
//! debugging of the diagnostic pipeline itself, where a conventional logger
//! would distort the timing being observed.
//!
//! # Example
//!
//! ```rust
//! use tracekit_rtlog::RtTraceLog;
//!
//! let log = RtTraceLog::new(16);
//! log.record("enqueue: start");
//! log.record("enqueue: done");
//!
//! let entries = log.snapshot_oldest_first();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].message, "enqueue: start");
//! ```

pub mod log;
pub mod prelude;

pub use log::{RtEntry, RtTraceLog, render};
