//! The task scheduler: a poll thread over a [`TaskStore`].
//!
//! One dedicated thread wakes up, dispatches every task whose due time has
//! passed, and sleeps. Callbacks run with the store unlocked, so a callback
//! may schedule follow-up tasks on the scheduler that is executing it; this
//! is the intended rescheduling idiom.

use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::store::{ScheduledTask, TaskId, TaskInfo, TaskParam, TaskStore};
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{Condvar, Mutex};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracekit_collector::TraceCollector;

type ChangeHandler = Arc<dyn Fn(&[TaskInfo]) + Send + Sync>;

struct Inner {
    store: Mutex<TaskStore>,
    change_handlers: Mutex<Vec<ChangeHandler>>,
    stopped: AtomicBool,
    /// Wakes the poll thread out of its idle sleep on add or shutdown.
    wakeup: Condvar,
    wakeup_lock: Mutex<()>,
    collector: Option<Arc<TraceCollector>>,
}

/// Runs deferred tasks at wall-clock times on a dedicated thread.
///
/// Dispatch is at-least-not-before: a task runs at the first poll round
/// after its due time, never earlier. Each task runs exactly once and is
/// consumed; periodic work is expressed by the callback scheduling its own
/// successor.
///
/// # Thread Safety
///
/// All methods take `&self` and are safe from any thread, including from a
/// callback running on the scheduler's own poll thread.
pub struct TaskScheduler {
    inner: Arc<Inner>,
    poll_interval: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskScheduler {
    /// Create a scheduler and start its poll thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the poll thread
    /// cannot be spawned.
    pub fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        Self::build(config, None)
    }

    /// Create a scheduler that reports task adds, dispatches and callback
    /// panics through `collector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the poll thread
    /// cannot be spawned.
    pub fn with_collector(
        config: SchedulerConfig,
        collector: Arc<TraceCollector>,
    ) -> SchedulerResult<Self> {
        Self::build(config, Some(collector))
    }

    fn build(
        config: SchedulerConfig,
        collector: Option<Arc<TraceCollector>>,
    ) -> SchedulerResult<Self> {
        config.validate()?;
        let inner = Arc::new(Inner {
            store: Mutex::new(TaskStore::new()),
            change_handlers: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            wakeup: Condvar::new(),
            wakeup_lock: Mutex::new(()),
            collector,
        });

        let poll_inner = Arc::clone(&inner);
        let poll_interval = config.poll_interval;
        let worker = std::thread::Builder::new()
            .name("tracekit-sched".to_owned())
            .spawn(move || Inner::poll_loop(&poll_inner, poll_interval))
            .map_err(|e| SchedulerError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            inner,
            poll_interval,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Schedule `callback` to run once `due` has passed. `parameter` is
    /// handed back to the callback at dispatch time; `description` shows up
    /// in [`TaskScheduler::pending`] snapshots and diagnostics.
    ///
    /// Callable from any thread, including from inside a running callback.
    pub fn add(
        &self,
        due: SystemTime,
        callback: impl Fn(TaskParam) + Send + Sync + 'static,
        parameter: TaskParam,
        description: Option<String>,
    ) -> TaskId {
        let id = {
            let mut store = self.inner.store.lock();
            store.insert(due, ScheduledTask::new(callback, parameter, description))
        };
        if let Some(collector) = &self.inner.collector {
            collector.trace_with_filter("scheduler", format!("task {id} scheduled"));
        }
        // Wake the poll thread so a near-due task is not left sleeping out
        // a full poll interval.
        {
            let _guard = self.inner.wakeup_lock.lock();
            self.inner.wakeup.notify_all();
        }
        id
    }

    /// Ordered snapshot of all pending tasks.
    #[must_use]
    pub fn pending(&self) -> Vec<TaskInfo> {
        self.inner.store.lock().pending()
    }

    /// Register a change handler. Handlers run on the poll thread when it
    /// goes idle after the task set changed; intermediate states between
    /// two idle points are coalesced away.
    pub fn on_tasks_changed(&self, handler: impl Fn(&[TaskInfo]) + Send + Sync + 'static) {
        self.inner.change_handlers.lock().push(Arc::new(handler));
    }

    /// Stop the poll thread and join it. Callable multiple times; a no-op
    /// after the first call. When called from inside a callback the join is
    /// skipped and the poll thread winds down on its own.
    pub fn shutdown(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            let _guard = self.inner.wakeup_lock.lock();
            self.inner.wakeup.notify_all();
            tracing::debug!("task scheduler stopping");
        }
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("task scheduler poll thread panicked");
            }
        }
    }

    /// Idle-loop latency bound this scheduler was built with.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("pending", &self.inner.store.lock().len())
            .field("poll_interval", &self.poll_interval)
            .field("stopped", &self.inner.stopped.load(Ordering::Relaxed))
            .finish()
    }
}

impl Inner {
    fn poll_loop(inner: &Arc<Inner>, poll_interval: Duration) {
        loop {
            if inner.stopped.load(Ordering::Acquire) {
                break;
            }
            let due = inner.store.lock().take_due(SystemTime::now());
            match due {
                Some((id, task)) => Inner::dispatch(inner, id, &task),
                None => {
                    Inner::notify_if_dirty(inner);
                    Inner::sleep_interruptibly(inner, poll_interval);
                }
            }
        }
        tracing::debug!("task scheduler poll thread exited");
    }

    /// Run one task with the store unlocked and panics contained.
    fn dispatch(inner: &Arc<Inner>, id: TaskId, task: &ScheduledTask) {
        let label = task.description().unwrap_or("<unnamed>");
        if catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
            tracing::error!(task = id, label, "scheduled task panicked");
            if let Some(collector) = &inner.collector {
                collector.error(format!("scheduled task {id} ({label}) panicked"));
            }
        } else if let Some(collector) = &inner.collector {
            collector.trace_with_filter("scheduler", format!("task {id} ({label}) dispatched"));
        }
    }

    /// Emit the coalesced tasks-changed notification, carrying a pending
    /// snapshot, if the store mutated since the last emission.
    fn notify_if_dirty(inner: &Arc<Inner>) {
        let snapshot = {
            let mut store = inner.store.lock();
            if !store.take_dirty() {
                return;
            }
            store.pending()
        };
        let handlers: Vec<ChangeHandler> = inner.change_handlers.lock().clone();
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&snapshot))).is_err() {
                tracing::error!("tasks-changed handler panicked");
            }
        }
    }

    fn sleep_interruptibly(inner: &Arc<Inner>, duration: Duration) {
        let mut guard = inner.wakeup_lock.lock();
        if inner.stopped.load(Ordering::Acquire) {
            return;
        }
        let _ = inner.wakeup.wait_for(&mut guard, duration);
    }
}
