//! Type-erased units of scheduled work.
//!
//! A [`Task`] wraps a continuation (together with the value cell that
//! migrated into it) behind a boxed closure so the run queue can hold
//! heterogeneous work. A task runs at most once and is consumed by running.

use core::fmt;

/// A run-once unit of work owned by the executor.
pub struct Task {
    work: Box<dyn FnOnce()>,
    /// Short static label for tracing.
    label: &'static str,
}

impl Task {
    /// Creates a task from a closure.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::with_label("task", work)
    }

    /// Creates a task with a tracing label.
    pub fn with_label<F>(label: &'static str, work: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            work: Box::new(work),
            label,
        }
    }

    /// Returns the task's label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Runs the task, consuming it.
    pub fn run(self) {
        tracing::trace!(label = self.label, "running task");
        (self.work)();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
