//! Batched, timer-driven trace collection with listener fan-out.
//!
//! The collector sits between producers on hot paths and consumers that
//! want messages in batches: producers append to a bounded ingestion queue
//! through a short critical section, and a background timer thread
//! periodically drains the queue, appends to a bounded retained buffer and
//! dispatches the batch to every registered listener.
//!
//! # Guarantees
//!
//! - Producers never block beyond an O(1) append under an uncontended lock.
//! - Per-producer message order is preserved end to end.
//! - Overflow drops the oldest queued message and is surfaced as an
//!   annotation on the next drained batch, never silently.
//! - A panicking listener is isolated; other listeners and the pipeline
//!   keep running.
//!
//! # Example
//!
//! ```no_run
//! use tracekit_collector::{CollectorConfig, TraceCollector};
//!
//! let collector = TraceCollector::new(CollectorConfig::default())?;
//! let (_id, backlog) = collector.add_listener(|batch| {
//!     for message in batch {
//!         println!("{message}");
//!     }
//! });
//! println!("{} message(s) before registration", backlog.len());
//! collector.trace("pipeline up");
//! collector.shutdown();
//! # Ok::<(), tracekit_collector::CollectorError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod collector;
pub mod config;
pub mod error;
pub mod message;
pub mod prelude;

pub use collector::{ListenerId, TraceCollector};
pub use config::{CollectorConfig, CollectorConfigBuilder};
pub use error::{CollectorError, CollectorResult};
pub use message::{TraceKind, TraceMessage};
