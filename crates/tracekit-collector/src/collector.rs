//! The trace collector: ingestion queue, drain timer and listener fan-out.
//!
//! Producers append messages through a short critical section; a dedicated
//! timer thread periodically swaps out the ingestion queue, copies the
//! batch into the retained buffer and hands the same batch to every
//! registered listener. Producers are never blocked for longer than the
//! O(1) queue append, and no lock is ever held across a listener call.

use crate::config::CollectorConfig;
use crate::error::{CollectorError, CollectorResult};
use crate::message::{TraceKind, TraceMessage};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracekit_rtlog::RtTraceLog;

/// Handle returned by [`TraceCollector::add_listener`], used for removal.
pub type ListenerId = u64;

type ListenerFn = Arc<dyn Fn(&[TraceMessage]) + Send + Sync>;

/// Sleep quantum while waiting out an in-flight drain cycle.
const WAIT_QUANTUM: Duration = Duration::from_millis(1);

struct QueueState {
    entries: VecDeque<TraceMessage>,
    limit: usize,
    /// Messages dropped since the last drain; folded into the overflow
    /// annotation of the next drained batch.
    dropped: u64,
}

struct RetainedState {
    entries: VecDeque<TraceMessage>,
    limit: usize,
}

struct ListenerState {
    next_id: ListenerId,
    handlers: Vec<(ListenerId, ListenerFn)>,
}

struct Inner {
    queue: Mutex<QueueState>,
    retained: Mutex<RetainedState>,
    listeners: Mutex<ListenerState>,
    /// Reentrancy guard: a timer tick that fires while a cycle runs is
    /// dropped, never queued.
    drain_running: AtomicBool,
    stopped: AtomicBool,
    paused: AtomicBool,
    interval_ms: AtomicU64,
    kind_enabled: [AtomicBool; 4],
    debug_log: Option<Arc<RtTraceLog>>,
    /// Wakes the timer thread out of its inter-cycle sleep on stop.
    wakeup: Condvar,
    wakeup_lock: Mutex<()>,
}

/// Collects trace messages from arbitrarily many threads, buffers them and
/// distributes them in batches to registered listeners from a background
/// timer thread.
///
/// The collector is an explicitly constructed service: build one at process
/// start, share it behind an [`Arc`], and call [`TraceCollector::shutdown`]
/// at process end. Tests can create isolated instances freely.
///
/// # Thread Safety
///
/// All methods take `&self` and are safe from any thread. Listeners run on
/// the collector's timer thread and must not block for long; a listener
/// that needs to remove itself must use [`TraceCollector::remove_listener`]
/// from another thread.
pub struct TraceCollector {
    inner: Arc<Inner>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl TraceCollector {
    /// Create a collector and start its drain timer thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the timer
    /// thread cannot be spawned.
    pub fn new(config: CollectorConfig) -> CollectorResult<Self> {
        Self::build(config, None)
    }

    /// Create a collector that additionally records its own pipeline events
    /// (drain start/end, overflow) into `debug_log` for low-overhead
    /// debugging of the collector itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the timer
    /// thread cannot be spawned.
    pub fn with_debug_log(
        config: CollectorConfig,
        debug_log: Arc<RtTraceLog>,
    ) -> CollectorResult<Self> {
        Self::build(config, Some(debug_log))
    }

    fn build(config: CollectorConfig, debug_log: Option<Arc<RtTraceLog>>) -> CollectorResult<Self> {
        config.validate()?;
        let inner = Arc::new(Inner {
            queue: Mutex::new(QueueState {
                entries: VecDeque::with_capacity(config.max_queue),
                limit: config.max_queue,
                dropped: 0,
            }),
            retained: Mutex::new(RetainedState {
                entries: VecDeque::with_capacity(config.max_retained),
                limit: config.max_retained,
            }),
            listeners: Mutex::new(ListenerState {
                next_id: 0,
                handlers: Vec::new(),
            }),
            drain_running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            interval_ms: AtomicU64::new(config.drain_interval.as_millis().max(1) as u64),
            kind_enabled: [
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
            ],
            debug_log,
            wakeup: Condvar::new(),
            wakeup_lock: Mutex::new(()),
        });

        let timer_inner = Arc::clone(&inner);
        let startup_delay = config.startup_delay;
        let timer = std::thread::Builder::new()
            .name("tracekit-drain".to_owned())
            .spawn(move || {
                Inner::sleep_interruptibly(&timer_inner, startup_delay);
                loop {
                    if timer_inner.stopped.load(Ordering::Acquire) {
                        break;
                    }
                    if !timer_inner.paused.load(Ordering::Acquire) {
                        Inner::drain_cycle(&timer_inner);
                    }
                    let interval = timer_inner.interval_ms.load(Ordering::Relaxed);
                    Inner::sleep_interruptibly(&timer_inner, Duration::from_millis(interval));
                }
            })
            .map_err(|e| CollectorError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            inner,
            timer: Mutex::new(Some(timer)),
        })
    }

    /// Append a severity-tagged message. Synchronous, non-blocking; the
    /// sole ingestion entry point.
    ///
    /// Messages of a kind disabled via
    /// [`TraceCollector::set_kind_enabled`] are filtered out before they
    /// enter the queue.
    pub fn enqueue(&self, kind: TraceKind, text: impl Into<String>, filter: Option<String>) {
        if !self.inner.kind_enabled[kind.index()].load(Ordering::Relaxed) {
            return;
        }
        Inner::enqueue_message(&self.inner, TraceMessage::new(kind, text, filter));
    }

    /// Write a plain trace message.
    pub fn trace(&self, text: impl Into<String>) {
        self.enqueue(TraceKind::Trace, text, None);
    }

    /// Write a trace message carrying a filter tag.
    pub fn trace_with_filter(&self, filter: impl Into<String>, text: impl Into<String>) {
        self.enqueue(TraceKind::Trace, text, Some(filter.into()));
    }

    /// Write a warning.
    pub fn warning(&self, text: impl Into<String>) {
        self.enqueue(TraceKind::Warning, text, None);
    }

    /// Write an error.
    pub fn error(&self, text: impl Into<String>) {
        self.enqueue(TraceKind::Error, text, None);
    }

    /// Write a caught error value with its full source chain.
    pub fn exception(&self, error: &(dyn std::error::Error + 'static), context: impl Into<String>) {
        let mut text = format!("{}: {error}", context.into());
        let mut source = error.source();
        while let Some(cause) = source {
            text.push_str("\n  caused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.enqueue(TraceKind::Exception, text, None);
    }

    /// Enable or disable collection of one message kind.
    pub fn set_kind_enabled(&self, kind: TraceKind, enabled: bool) {
        self.inner.kind_enabled[kind.index()].store(enabled, Ordering::Relaxed);
    }

    /// Register a listener and return, atomically with the registration,
    /// the current retained-buffer contents. The combination guarantees the
    /// caller observes every message: older ones via the returned snapshot,
    /// newer ones via dispatch (a message delivered through both is
    /// possible and must be tolerated).
    pub fn add_listener(
        &self,
        handler: impl Fn(&[TraceMessage]) + Send + Sync + 'static,
    ) -> (ListenerId, Vec<TraceMessage>) {
        let mut listeners = self.inner.listeners.lock();
        let retained = self.inner.retained.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.handlers.push((id, Arc::new(handler)));
        (id, retained.entries.iter().cloned().collect())
    }

    /// Remove a listener. With `needs_flush`, an out-of-band drain runs
    /// first so the listener has seen every message enqueued before this
    /// call.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a registered listener.
    pub fn remove_listener(&self, id: ListenerId, needs_flush: bool) -> CollectorResult<()> {
        if needs_flush {
            self.flush(false);
        }
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.handlers.len();
        listeners.handlers.retain(|(handler_id, _)| *handler_id != id);
        if listeners.handlers.len() == before {
            return Err(CollectorError::UnknownListener(id));
        }
        Ok(())
    }

    /// Force an immediate synchronous drain cycle, waiting for any
    /// in-flight cycle to finish first. With `needs_stop`, the timer is
    /// permanently stopped afterwards.
    pub fn flush(&self, needs_stop: bool) {
        while self.inner.drain_running.load(Ordering::Acquire) {
            std::thread::sleep(WAIT_QUANTUM);
        }
        // Even if a cycle just ran, run one more: messages may have been
        // enqueued while its listeners were executing.
        while !Inner::drain_cycle(&self.inner) {
            std::thread::sleep(WAIT_QUANTUM);
        }
        if needs_stop {
            self.stop();
        }
    }

    /// Permanently stop the drain timer. Idempotent; enqueued messages can
    /// still be collected through [`TraceCollector::trace_snapshot`] with
    /// flushing disabled.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            let _guard = self.inner.wakeup_lock.lock();
            self.inner.wakeup.notify_all();
            tracing::debug!("trace collector timer stopped");
        }
    }

    /// Copy of the retained buffer. With `needs_flush`, pending ingestion
    /// queue entries are drained first so the very latest messages are
    /// included.
    #[must_use]
    pub fn trace_snapshot(&self, needs_flush: bool) -> Vec<TraceMessage> {
        if needs_flush {
            self.flush(false);
        }
        let retained = self.inner.retained.lock();
        retained.entries.iter().cloned().collect()
    }

    /// Change intervals and buffer bounds at runtime.
    ///
    /// The timer is paused, any in-flight drain is waited out, and the
    /// bounds are swapped under the same locks the drain takes, so a cycle
    /// can never observe a torn configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the new configuration is invalid.
    pub fn reconfigure(&self, config: CollectorConfig) -> CollectorResult<()> {
        config.validate()?;
        self.inner.paused.store(true, Ordering::Release);
        while self.inner.drain_running.load(Ordering::Acquire) {
            std::thread::sleep(WAIT_QUANTUM);
        }
        {
            let mut retained = self.inner.retained.lock();
            let mut queue = self.inner.queue.lock();
            retained.limit = config.max_retained;
            while retained.entries.len() > retained.limit {
                retained.entries.pop_front();
            }
            queue.limit = config.max_queue;
            while queue.entries.len() > queue.limit {
                queue.entries.pop_front();
                queue.dropped += 1;
            }
        }
        self.inner
            .interval_ms
            .store(config.drain_interval.as_millis().max(1) as u64, Ordering::Relaxed);
        self.inner.paused.store(false, Ordering::Release);
        Ok(())
    }

    /// Flush all pending messages, stop the timer and join its thread.
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        self.flush(true);
        let handle = self.timer.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("trace collector timer thread panicked");
            }
        }
    }
}

impl Drop for TraceCollector {
    fn drop(&mut self) {
        self.stop();
        let handle = self.timer.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for TraceCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceCollector")
            .field("queued", &self.inner.queue.lock().entries.len())
            .field("retained", &self.inner.retained.lock().entries.len())
            .field("listeners", &self.inner.listeners.lock().handlers.len())
            .field("stopped", &self.inner.stopped.load(Ordering::Relaxed))
            .finish()
    }
}

impl Inner {
    /// Sleep for `duration`, waking early when the collector is stopped.
    fn sleep_interruptibly(inner: &Arc<Inner>, duration: Duration) {
        let mut guard = inner.wakeup_lock.lock();
        if inner.stopped.load(Ordering::Acquire) {
            return;
        }
        let _ = inner.wakeup.wait_for(&mut guard, duration);
    }

    fn enqueue_message(inner: &Arc<Inner>, message: TraceMessage) {
        let mut queue = inner.queue.lock();
        if queue.entries.len() >= queue.limit {
            queue.entries.pop_front();
            queue.dropped += 1;
        }
        queue.entries.push_back(message);
    }

    /// Run one drain cycle. Returns `false` iff another cycle was already
    /// in flight (the tick is dropped, never queued).
    fn drain_cycle(inner: &Arc<Inner>) -> bool {
        if inner.stopped.load(Ordering::Acquire) {
            return true;
        }
        if inner.drain_running.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(log) = &inner.debug_log {
            log.record("drain: start");
        }

        let (mut batch, dropped) = {
            let mut queue = inner.queue.lock();
            let batch: Vec<TraceMessage> = queue.entries.drain(..).collect();
            let dropped = std::mem::take(&mut queue.dropped);
            (batch, dropped)
        };

        if batch.is_empty() && dropped == 0 {
            if let Some(log) = &inner.debug_log {
                log.record("drain: idle");
            }
            inner.drain_running.store(false, Ordering::Release);
            return true;
        }

        if dropped > 0 {
            // The annotation rides on the next successfully drained
            // message, not on the one that caused the loss.
            let annotation = format!("[overflow: {dropped} message(s) dropped]");
            if let Some(log) = &inner.debug_log {
                log.record(annotation.clone());
            }
            tracing::warn!(dropped, "trace ingestion queue overflowed");
            match batch.first_mut() {
                Some(first) => first.text = format!("{annotation} {}", first.text),
                None => batch.push(TraceMessage::new(TraceKind::Error, annotation, None)),
            }
        }

        {
            let mut retained = inner.retained.lock();
            for message in &batch {
                if retained.entries.len() >= retained.limit {
                    retained.entries.pop_front();
                }
                retained.entries.push_back(message.clone());
            }
        }

        let handlers: Vec<(ListenerId, ListenerFn)> = inner.listeners.lock().handlers.clone();
        for (id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&batch))).is_err() {
                tracing::error!(listener = id, "trace listener panicked during dispatch");
                // Self-hosting: the failure travels the same path as any
                // other diagnostic.
                if inner.kind_enabled[TraceKind::Error.index()].load(Ordering::Relaxed) {
                    Inner::enqueue_message(
                        inner,
                        TraceMessage::new(
                            TraceKind::Error,
                            format!("trace listener {id} panicked during dispatch"),
                            None,
                        ),
                    );
                }
            }
        }

        if let Some(log) = &inner.debug_log {
            log.record(format!("drain: dispatched {} message(s)", batch.len()));
        }
        inner.drain_running.store(false, Ordering::Release);
        true
    }
}
