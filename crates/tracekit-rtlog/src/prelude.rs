//! Convenience re-exports for common usage.

pub use crate::log::{RtEntry, RtTraceLog, render};
