//! Two-lane cooperative run queue.
//!
//! This is the scheduler surface the hand-off core consumes:
//!
//! 1. Urgent lane — tasks enqueued by latency-sensitive fulfilment paths
//!    (forwarding, wake-ups). Drained first.
//! 2. Normal lane — everything else, strict FIFO.
//!
//! Within each lane order is FIFO; an urgent task runs before any normal
//! task that is still queued. The queue is per-thread: every promise,
//! future and continuation lives on exactly one executor thread, so no
//! locking is involved.
//!
//! [`need_preempt`] is the cooperative back-pressure signal: when set,
//! fulfilment paths stop inlining continuations and go through the queue so
//! a long ready-chain cannot starve other work. The surrounding runtime (or
//! a test) steers it with [`set_need_preempt`].

use crate::task::Task;
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Default)]
struct RunQueue {
    urgent: VecDeque<Task>,
    normal: VecDeque<Task>,
    need_preempt: bool,
}

impl RunQueue {
    fn pop(&mut self) -> Option<Task> {
        self.urgent.pop_front().or_else(|| self.normal.pop_front())
    }

    fn len(&self) -> usize {
        self.urgent.len() + self.normal.len()
    }
}

thread_local! {
    static QUEUE: RefCell<RunQueue> = RefCell::default();
}

/// Appends a task to the normal lane.
pub fn enqueue(task: Task) {
    tracing::trace!(label = task.label(), "enqueue");
    QUEUE.with(|q| q.borrow_mut().normal.push_back(task));
}

/// Appends a task to the urgent lane, ahead of all queued normal work.
///
/// Callers are expected to check [`need_preempt`] first; when preemption is
/// due, fulfilment paths fall back to [`enqueue`].
pub fn enqueue_urgent(task: Task) {
    tracing::trace!(label = task.label(), "enqueue urgent");
    QUEUE.with(|q| q.borrow_mut().urgent.push_back(task));
}

/// Returns true when queued work should take priority over further inline
/// execution.
#[must_use]
pub fn need_preempt() -> bool {
    QUEUE.with(|q| q.borrow().need_preempt)
}

/// Sets the preemption signal for this thread.
pub fn set_need_preempt(flag: bool) {
    QUEUE.with(|q| q.borrow_mut().need_preempt = flag);
}

/// Number of tasks currently queued on this thread.
#[must_use]
pub fn pending() -> usize {
    QUEUE.with(|q| q.borrow().len())
}

/// Runs the next queued task, if any. Returns false when both lanes are
/// empty.
pub fn run_one() -> bool {
    let task = QUEUE.with(|q| q.borrow_mut().pop());
    match task {
        Some(task) => {
            task.run();
            true
        }
        None => false,
    }
}

/// Drains the queue, including tasks enqueued while draining. Returns the
/// number of tasks run.
pub fn run_pending() -> usize {
    let mut ran = 0;
    while run_one() {
        ran += 1;
    }
    ran
}
