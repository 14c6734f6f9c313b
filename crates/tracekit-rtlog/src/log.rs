//! Circular trace log with masked-index slot selection.
//!
//! A single wrapping 32-bit cursor is incremented atomically per record and
//! masked with `capacity - 1` to pick the slot, so producers never contend
//! on a shared lock. The capacity must satisfy `2^31 % capacity == 0`
//! (i.e. be a power of two no larger than `2^31`) so that the eventual
//! wraparound of the cursor still lands on a consistent slot boundary.
//!
//! Each slot carries its own uncontended guard: the C#-style "benign torn
//! read" is not expressible in safe Rust, and two producers only meet on
//! the same slot after a full cursor wrap during a single write.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::time::Instant;

/// Default slot count, matching a few milliseconds of dense tracing.
pub const DEFAULT_CAPACITY: usize = 0x1000;

/// One copied-out log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtEntry {
    /// Ordinal position within the snapshot (0-based, in walk order).
    pub position: u32,
    /// Nanoseconds elapsed since log creation, clamped to at least 1.
    pub elapsed_ns: u64,
    /// Name of the recording thread, `thread-<id>` if unnamed.
    pub thread: String,
    /// The recorded message.
    pub message: String,
}

#[derive(Default)]
struct RtSlot {
    /// 0 means the slot has never been written.
    elapsed_ns: u64,
    thread: String,
    message: String,
}

/// Fixed-capacity multi-producer circular trace log.
///
/// Recording is wait-free with respect to other producers except for the
/// per-slot guard, which is only contended when the cursor wraps fully
/// around the buffer during one write. Snapshots suspend recording via a
/// flag (recorded messages are dropped, producers are never blocked).
pub struct RtTraceLog {
    slots: Box<[Mutex<RtSlot>]>,
    mask: u32,
    cursor: AtomicU32,
    started: Instant,
    stopped: AtomicBool,
    snapshotting: AtomicBool,
}

impl RtTraceLog {
    /// Create a log with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, not a power of two, or fails the
    /// `2^31 % capacity == 0` wraparound invariant.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity.is_power_of_two(),
            "RtTraceLog capacity {capacity} must be a non-zero power of two"
        );
        assert!(
            (1u64 << 31) % capacity as u64 == 0,
            "RtTraceLog capacity {capacity} does not satisfy 2^31 % capacity == 0"
        );
        let slots = (0..capacity)
            .map(|_| Mutex::new(RtSlot::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            mask: (capacity - 1) as u32,
            cursor: AtomicU32::new(0),
            started: Instant::now(),
            stopped: AtomicBool::new(false),
            snapshotting: AtomicBool::new(false),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Explicitly stop (or resume) recording. While stopped, `record` is a
    /// no-op.
    pub fn set_stopped(&self, stopped: bool) {
        self.stopped.store(stopped, Ordering::Release);
    }

    /// Whether `record` currently drops messages, either because recording
    /// was stopped explicitly or because a snapshot is in progress.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.stopped.load(Ordering::Acquire) || self.snapshotting.load(Ordering::Acquire)
    }

    /// Record a message into the next slot.
    ///
    /// No-op while suspended. Producer cost is one atomic increment plus an
    /// uncontended slot guard; other producers are never blocked.
    pub fn record(&self, message: impl Into<String>) {
        if self.is_suspended() {
            return;
        }
        let seq = self.cursor.fetch_add(1, Ordering::Relaxed);
        let index = (seq & self.mask) as usize;
        // Clamped so 0 keeps meaning "never written".
        let elapsed_ns = (self.started.elapsed().as_nanos() as u64).max(1);
        let mut slot = self.slots[index].lock();
        slot.elapsed_ns = elapsed_ns;
        slot.thread = current_thread_name();
        slot.message = message.into();
    }

    /// Copy out all recorded entries, newest first.
    ///
    /// Recording is suspended for the duration of the copy. The walk goes
    /// backward from the cursor until it meets an unwritten slot or has
    /// visited the whole buffer.
    #[must_use]
    pub fn snapshot_newest_first(&self) -> Vec<RtEntry> {
        self.with_recording_suspended(|| {
            let mut entries = Vec::new();
            let latest = self.cursor.load(Ordering::Acquire).wrapping_sub(1);
            for position in 0..self.slots.len() as u32 {
                let index = (latest.wrapping_sub(position) & self.mask) as usize;
                let slot = self.slots[index].lock();
                if slot.elapsed_ns == 0 {
                    break;
                }
                entries.push(RtEntry {
                    position,
                    elapsed_ns: slot.elapsed_ns,
                    thread: slot.thread.clone(),
                    message: slot.message.clone(),
                });
            }
            entries
        })
    }

    /// Copy out all recorded entries, oldest first.
    ///
    /// Recording is suspended for the duration of the copy. Whether the
    /// buffer has wrapped is decided by inspecting the slot immediately
    /// following the cursor: written means the oldest surviving entry lives
    /// there, unwritten means the walk starts at slot zero.
    #[must_use]
    pub fn snapshot_oldest_first(&self) -> Vec<RtEntry> {
        self.with_recording_suspended(|| {
            let cursor = self.cursor.load(Ordering::Acquire);
            let following = (cursor & self.mask) as usize;
            let wrapped = self.slots[following].lock().elapsed_ns != 0;
            let (start, count) = if wrapped {
                (following, self.slots.len())
            } else {
                (0, following)
            };

            let mut entries = Vec::with_capacity(count);
            for position in 0..count {
                let index = (start + position) % self.slots.len();
                let slot = self.slots[index].lock();
                entries.push(RtEntry {
                    position: position as u32,
                    elapsed_ns: slot.elapsed_ns,
                    thread: slot.thread.clone(),
                    message: slot.message.clone(),
                });
            }
            entries
        })
    }

    fn with_recording_suspended<R>(&self, copy: impl FnOnce() -> R) -> R {
        self.snapshotting.store(true, Ordering::Release);
        let result = copy();
        self.snapshotting.store(false, Ordering::Release);
        result
    }
}

impl Default for RtTraceLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for RtTraceLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtTraceLog")
            .field("capacity", &self.slots.len())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .field("suspended", &self.is_suspended())
            .finish()
    }
}

/// Render a snapshot as one line per entry: ordinal, millisecond offset
/// from the first entry, thread and message, tab-separated.
#[must_use]
pub fn render(entries: &[RtEntry]) -> String {
    let base_ns = entries.first().map_or(0, |entry| entry.elapsed_ns);
    let mut out = String::new();
    for entry in entries {
        let offset_ms = (entry.elapsed_ns as f64 - base_ns as f64) / 1_000_000.0;
        let _ = writeln!(
            out,
            "{:04}\t{:+010.5}\t{}\t{}",
            entry.position, offset_ms, entry.thread, entry.message
        );
    }
    out
}

fn current_thread_name() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_owned(),
        None => format!("thread-{:?}", current.id()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn records_and_reads_back_in_order() {
        let log = RtTraceLog::new(16);
        log.record("first");
        log.record("second");
        log.record("third");

        let oldest = log.snapshot_oldest_first();
        assert_eq!(oldest.len(), 3);
        assert_eq!(oldest[0].message, "first");
        assert_eq!(oldest[2].message, "third");

        let newest = log.snapshot_newest_first();
        assert_eq!(newest.len(), 3);
        assert_eq!(newest[0].message, "third");
        assert_eq!(newest[2].message, "first");
    }

    #[test]
    fn overwrites_oldest_after_wrap() {
        let capacity = 8;
        let log = RtTraceLog::new(capacity);
        for sequence in 0..capacity + 5 {
            log.record(format!("msg-{sequence}"));
        }

        let entries = log.snapshot_oldest_first();
        assert_eq!(entries.len(), capacity);
        for (position, entry) in entries.iter().enumerate() {
            assert_eq!(entry.message, format!("msg-{}", position + 5));
            assert_eq!(entry.position, position as u32);
        }
        // Elapsed values must not decrease along the oldest-first walk.
        for window in entries.windows(2) {
            assert!(window[0].elapsed_ns <= window[1].elapsed_ns);
        }
    }

    #[test]
    fn stopped_log_drops_records() {
        let log = RtTraceLog::new(8);
        log.record("kept");
        log.set_stopped(true);
        log.record("dropped");
        log.set_stopped(false);

        let entries = log.snapshot_oldest_first();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
    }

    #[test]
    fn unfilled_buffer_snapshot_stops_at_unwritten_slot() {
        let log = RtTraceLog::new(64);
        log.record("only");
        assert_eq!(log.snapshot_newest_first().len(), 1);
        assert_eq!(log.snapshot_oldest_first().len(), 1);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_capacity_panics() {
        let _ = RtTraceLog::new(100);
    }

    #[test]
    fn render_includes_thread_and_message() {
        let log = RtTraceLog::new(8);
        log.record("hello");
        let text = render(&log.snapshot_oldest_first());
        assert!(text.contains("hello"));
        assert!(text.starts_with("0000\t"));
    }
}
