//! Ordered task storage.
//!
//! The store is a plain single-threaded container; [`crate::TaskScheduler`]
//! wraps it in a mutex and is the only concurrent user. Tasks are keyed by
//! `(due time, id)` so that tasks sharing a due time dispatch in insertion
//! order.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Strictly increasing task identifier, unique per store.
pub type TaskId = u64;

/// Opaque parameter handed back to the callback at dispatch time.
pub type TaskParam = Arc<dyn Any + Send + Sync>;

type TaskCallback = Arc<dyn Fn(TaskParam) + Send + Sync>;

/// A stored task. Immutable once inserted; rescheduling means inserting a
/// new task with a fresh id.
pub struct ScheduledTask {
    callback: TaskCallback,
    parameter: TaskParam,
    description: Option<String>,
}

impl ScheduledTask {
    /// Build a task from a callback, its parameter and an optional
    /// description used in snapshots and diagnostics.
    pub fn new(
        callback: impl Fn(TaskParam) + Send + Sync + 'static,
        parameter: TaskParam,
        description: Option<String>,
    ) -> Self {
        Self {
            callback: Arc::new(callback),
            parameter,
            description,
        }
    }

    /// Invoke the callback with the stored parameter.
    pub fn run(&self) {
        (self.callback)(Arc::clone(&self.parameter));
    }

    /// Human-readable description, if one was given.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a pending task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Task identifier.
    pub id: TaskId,
    /// Wall-clock time the task becomes due.
    pub due: SystemTime,
    /// Optional description given at insertion.
    pub description: Option<String>,
}

/// Tasks ordered by `(due time, id)`.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: BTreeMap<(SystemTime, TaskId), ScheduledTask>,
    next_id: TaskId,
    /// Set on every mutation; consumed by the scheduler to coalesce
    /// change notifications.
    dirty: bool,
}

impl TaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task due at `due` and return its id.
    pub fn insert(&mut self, due: SystemTime, task: ScheduledTask) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.insert((due, id), task);
        self.dirty = true;
        id
    }

    /// Remove and return the earliest task whose due time has passed, or
    /// `None` when nothing is due at `now`.
    pub fn take_due(&mut self, now: SystemTime) -> Option<(TaskId, ScheduledTask)> {
        let (&(due, id), _) = self.tasks.first_key_value()?;
        if due > now {
            return None;
        }
        let task = self.tasks.remove(&(due, id))?;
        self.dirty = true;
        Some((id, task))
    }

    /// Ordered snapshot of all pending tasks.
    #[must_use]
    pub fn pending(&self) -> Vec<TaskInfo> {
        self.tasks
            .iter()
            .map(|(&(due, id), task)| TaskInfo {
                id,
                due,
                description: task.description.clone(),
            })
            .collect()
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the store holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Clear and return the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
