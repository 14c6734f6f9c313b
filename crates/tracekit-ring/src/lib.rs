//! Fixed-capacity lock-free SPSC ring queue.
//!
//! This crate provides [`RingQueue`], a bounded first-in/first-out queue for
//! exactly one producer thread and one consumer thread. It is built for hot
//! paths that must never block:
//!
//! - Bounded capacity (no allocation after construction)
//! - Lock-free slot storage, atomic index arithmetic
//! - Overflow is a boolean failure return, never an error value
//! - Deterministic execution time for enqueue and dequeue
//!
//! # Example
//!
//! ```rust
//! use tracekit_ring::RingQueue;
//!
//! let queue = RingQueue::new(5);
//!
//! // Producer thread - push without blocking
//! assert!(queue.try_enqueue(1u64));
//! assert!(queue.try_enqueue(2u64));
//!
//! // Consumer thread - drain
//! assert_eq!(queue.try_dequeue(), Some(1));
//! assert_eq!(queue.try_dequeue(), Some(2));
//! assert_eq!(queue.try_dequeue(), None);
//! ```

pub mod prelude;
pub mod ring;

pub use ring::RingQueue;
