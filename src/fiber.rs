//! The blocking-wait bridge for cooperatively scheduled fibers.
//!
//! `Future::get`/`Future::wait` on a pending result must suspend the caller
//! without stalling the executor. The bridge exposes the minimal switcher
//! surface the core consumes:
//!
//! - [`current_fiber`] — the innermost fiber scope on this thread, if any;
//! - [`switch_out`] — yield until the handle is switched back in;
//! - [`switch_in`] — mark the handle runnable again.
//!
//! The default switcher is *executor-driven*: [`switch_out`] pumps the run
//! queue until the wake continuation calls [`switch_in`]. Other work keeps
//! running while the fiber is parked, which is the whole point. A stackful
//! switcher can replace this module without touching the core: the wait path
//! only uses the three functions above.
//!
//! [`run`] installs a fiber scope around a closure:
//!
//! ```
//! use tether::{fiber, Promise};
//!
//! let mut promise = Promise::new();
//! let future = promise.detach_future();
//! promise.set_value(7);
//!
//! let value = fiber::run(move || future.get().expect("value expected"));
//! assert_eq!(value, 7);
//! ```

use crate::executor;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug)]
struct FiberState {
    id: u64,
    runnable: Cell<bool>,
}

/// A handle to a suspended or running fiber scope.
#[derive(Debug, Clone)]
pub struct FiberHandle(Rc<FiberState>);

impl FiberHandle {
    fn new(id: u64) -> Self {
        Self(Rc::new(FiberState {
            id,
            runnable: Cell::new(false),
        }))
    }

    /// A per-thread identifier, for tracing.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }
}

thread_local! {
    static FIBER_STACK: RefCell<Vec<FiberHandle>> = const { RefCell::new(Vec::new()) };
    static NEXT_FIBER_ID: Cell<u64> = const { Cell::new(0) };
}

/// Returns the innermost fiber scope on this thread, if any.
#[must_use]
pub fn current_fiber() -> Option<FiberHandle> {
    FIBER_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Marks the handle runnable, resuming a fiber parked in [`switch_out`].
pub fn switch_in(handle: &FiberHandle) {
    tracing::trace!(fiber = handle.id(), "switch in");
    handle.0.runnable.set(true);
}

/// Parks the current fiber until the handle is switched back in, running
/// queued tasks in the meantime.
///
/// # Panics
///
/// Panics if the run queue drains without anyone switching the fiber back
/// in — the fiber would block forever.
pub fn switch_out(handle: &FiberHandle) {
    tracing::trace!(fiber = handle.id(), "switch out");
    while !handle.0.runnable.get() {
        assert!(
            executor::run_one(),
            "fiber {} would block forever: the run queue is idle and nothing \
             can switch it back in",
            handle.id()
        );
    }
    handle.0.runnable.set(false);
}

/// Pops the fiber scope on drop, panic or not.
struct FiberScope;

impl Drop for FiberScope {
    fn drop(&mut self) {
        FIBER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` inside a fiber scope, so blocking waits inside it can suspend.
pub fn run<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let id = NEXT_FIBER_ID.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    });
    let handle = FiberHandle::new(id);
    FIBER_STACK.with(|stack| stack.borrow_mut().push(handle));
    let _scope = FiberScope;
    tracing::trace!(fiber = id, "fiber scope entered");
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn no_fiber_outside_a_scope() {
        assert!(current_fiber().is_none());
    }

    #[test]
    fn run_installs_and_removes_the_scope() {
        run(|| {
            assert!(current_fiber().is_some());
        });
        assert!(current_fiber().is_none());
    }

    #[test]
    fn scopes_nest() {
        run(|| {
            let outer = current_fiber().expect("outer fiber expected");
            run(|| {
                let inner = current_fiber().expect("inner fiber expected");
                assert_ne!(outer.id(), inner.id());
            });
            let back = current_fiber().expect("outer fiber expected");
            assert_eq!(outer.id(), back.id());
        });
    }

    #[test]
    fn switch_out_pumps_the_queue_until_woken() {
        run(|| {
            let handle = current_fiber().expect("fiber expected");
            let wake = handle.clone();
            crate::executor::enqueue(Task::new(move || switch_in(&wake)));
            switch_out(&handle);
        });
    }

    #[test]
    #[should_panic(expected = "would block forever")]
    fn deadlocked_switch_out_panics() {
        run(|| {
            let handle = current_fiber().expect("fiber expected");
            switch_out(&handle);
        });
    }
}
