//! Single-producer/single-consumer ring queue with atomic index arithmetic.
//!
//! One slot is permanently sacrificed so that `write == read` unambiguously
//! means empty and `write + 1 == read (mod capacity)` means full. A queue
//! constructed with capacity `C` therefore holds at most `C - 1` items.
//!
//! # Thread Safety
//!
//! Exactly one thread may enqueue and exactly one (possibly different)
//! thread may dequeue. The write index is only advanced by the producer,
//! the read index only by the consumer. `len`, `is_empty` and `is_full`
//! are advisory under concurrent access: the value may be stale by the
//! time the caller observes it.

use core::sync::atomic::{AtomicUsize, Ordering};
use crossbeam::atomic::AtomicCell;

/// Fixed-capacity single-producer/single-consumer FIFO queue.
///
/// Values are stored by copy. All operations are O(1) and never block.
///
/// # Example
///
/// ```rust
/// use tracekit_ring::RingQueue;
///
/// let queue = RingQueue::new(4);
/// assert!(queue.try_enqueue(7u32));
/// assert_eq!(queue.peek_at(0), Some(7));
/// assert_eq!(queue.try_dequeue(), Some(7));
/// assert!(queue.is_empty());
/// ```
pub struct RingQueue<T: Copy + Send> {
    slots: Box<[AtomicCell<Option<T>>]>,
    /// Next slot the producer writes. Producer-owned.
    write: AtomicUsize,
    /// Next slot the consumer reads. Consumer-owned.
    read: AtomicUsize,
}

impl<T: Copy + Send> RingQueue<T> {
    /// Create a queue with `capacity` slots, holding at most `capacity - 1`
    /// items.
    ///
    /// This is an initialization-time operation that allocates the slot
    /// storage. After creation, no further allocations occur.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` (a queue with fewer than two slots cannot
    /// hold anything).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "RingQueue capacity must be at least 2");
        let slots = (0..capacity)
            .map(|_| AtomicCell::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Total number of slots, one of which is always kept free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Append an item. Returns `false` iff the queue is full.
    ///
    /// Producer thread only. Never blocks.
    #[inline]
    pub fn try_enqueue(&self, item: T) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let next = self.advance(write);
        if next == self.read.load(Ordering::Acquire) {
            return false;
        }
        self.slots[write].store(Some(item));
        self.write.store(next, Ordering::Release);
        true
    }

    /// Read and remove the oldest item. Returns `None` iff the queue is
    /// empty.
    ///
    /// Consumer thread only. Never blocks.
    #[inline]
    pub fn try_dequeue(&self) -> Option<T> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }
        let item = self.slots[read].take();
        self.read.store(self.advance(read), Ordering::Release);
        item
    }

    /// Discard the oldest item unconditionally.
    ///
    /// Consumer thread only.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty. Use [`RingQueue::try_dequeue`] when
    /// emptiness is a normal condition.
    pub fn remove(&self) {
        let read = self.read.load(Ordering::Relaxed);
        assert!(
            read != self.write.load(Ordering::Acquire),
            "RingQueue::remove on empty queue"
        );
        self.slots[read].store(None);
        self.read.store(self.advance(read), Ordering::Release);
    }

    /// Discard all items by resetting the reader to the writer position.
    ///
    /// Not safe to call while a producer is enqueueing.
    pub fn clear(&self) {
        self.read
            .store(self.write.load(Ordering::Acquire), Ordering::Release);
    }

    /// Read the item at `offset` relative to the current read position
    /// without removing it. Returns `None` if fewer than `offset + 1` items
    /// are queued.
    ///
    /// Only valid while no concurrent dequeue is running; the reading
    /// thread is expected to be the consumer.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<T> {
        if offset >= self.len() {
            return None;
        }
        let read = self.read.load(Ordering::Acquire);
        let index = (read + offset) % self.slots.len();
        self.slots[index].load()
    }

    /// Number of queued items. Advisory under concurrent access.
    #[must_use]
    pub fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            write + self.slots.len() - read
        }
    }

    /// Whether the queue holds no items. Advisory under concurrent access.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.write.load(Ordering::Acquire)
    }

    /// Whether the queue is at its `capacity - 1` item limit. Advisory
    /// under concurrent access.
    #[must_use]
    pub fn is_full(&self) -> bool {
        let write = self.write.load(Ordering::Acquire);
        self.advance(write) == self.read.load(Ordering::Acquire)
    }

    #[inline]
    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.slots.len() { 0 } else { next }
    }
}

impl<T: Copy + Send> std::fmt::Debug for RingQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingQueue")
            .field("capacity", &self.slots.len())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
