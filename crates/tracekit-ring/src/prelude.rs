//! Convenience re-exports for common usage.

pub use crate::ring::RingQueue;
