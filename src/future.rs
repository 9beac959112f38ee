//! The consumer half of a hand-off pair.
//!
//! A [`Future`] represents a result that may not have been computed yet. It
//! is in one of three states:
//!
//! - *linked*: still tethered to its promise; the authoritative cell lives
//!   in the shared link;
//! - *disconnected-available*: the future owns a settled cell directly
//!   (ready futures are born this way and never touch a link);
//! - *consumed*: a terminal operation fired.
//!
//! The normal way of working with futures is to chain continuations with
//! [`Future::then`] and friends. When the result is already available and no
//! preemption is due, chaining runs the continuation inline; otherwise the
//! continuation is attached to the pair and runs from the executor once the
//! promise fulfils it. At most one continuation is ever attached to a
//! future.
//!
//! ```
//! use tether::{executor, ready_value};
//!
//! let fut = ready_value(6).then(|x: i32| Ok::<_, tether::Failure>(x * 7));
//! executor::run_pending();
//! assert_eq!(fut.get().expect("value expected"), 42);
//! ```

use crate::cell::{Outcome, ValueCell};
use crate::diag;
use crate::executor;
use crate::failure::{Failure, FailureKind};
use crate::fiber;
use crate::lift::Lift;
use crate::link::{Continuation, Link};
use crate::promise::Promise;
use crate::task::Task;
use core::fmt;
use core::mem;
use std::cell::RefCell;
use std::rc::Rc;

/// A representation of a possibly not-yet-computed value.
#[must_use = "futures carry results that must be consumed, forwarded or ignored"]
pub struct Future<T: 'static> {
    inner: FutureInner<T>,
}

enum FutureInner<T: 'static> {
    /// Disconnected; the settled cell is owned directly.
    Local(ValueCell<T>),
    /// Tethered to a promise through the migration link.
    Linked(Link<T>),
    /// A terminal operation consumed this future.
    Consumed,
}

/// Creates a future in an available, value state.
pub fn ready_value<T: 'static>(value: T) -> Future<T> {
    Future::from_cell(ValueCell::with_value(value))
}

/// Creates an available empty future.
pub fn ready() -> Future<()> {
    ready_value(())
}

/// Creates a future in an available, failed state.
pub fn ready_failure<T: 'static>(failure: Failure) -> Future<T> {
    Future::from_cell(ValueCell::with_failure(failure))
}

/// Convenience: creates a failed future from a kind and message.
pub fn ready_failure_of<T: 'static>(kind: FailureKind, message: impl Into<String>) -> Future<T> {
    ready_failure(Failure::with_message(kind, message))
}

impl<T: 'static> Future<T> {
    /// Wraps a settled cell in a disconnected future.
    pub(crate) fn from_cell(cell: ValueCell<T>) -> Self {
        Self {
            inner: FutureInner::Local(cell),
        }
    }

    /// Wraps a link in a tethered future.
    pub(crate) fn from_link(link: Link<T>) -> Self {
        Self {
            inner: FutureInner::Linked(link),
        }
    }

    /// Returns true if the future has a value or has failed.
    #[must_use]
    pub fn available(&self) -> bool {
        match &self.inner {
            FutureInner::Local(cell) => cell.available(),
            FutureInner::Linked(link) => link.cell_available(),
            FutureInner::Consumed => false,
        }
    }

    /// Returns true if the future is available and has failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        match &self.inner {
            FutureInner::Local(cell) => cell.failed(),
            FutureInner::Linked(link) => link.cell_failed(),
            FutureInner::Consumed => false,
        }
    }

    fn failed_kind(&self) -> Option<FailureKind> {
        match &self.inner {
            FutureInner::Local(cell) => cell.failure().map(Failure::kind),
            FutureInner::Linked(link) => link.cell_failure_kind(),
            FutureInner::Consumed => None,
        }
    }

    /// Takes the settled cell out, disconnecting from the promise and
    /// leaving this future consumed.
    fn take_available_cell(&mut self) -> ValueCell<T> {
        match mem::replace(&mut self.inner, FutureInner::Consumed) {
            FutureInner::Local(cell) => cell,
            FutureInner::Linked(link) => link.detach_cell(),
            FutureInner::Consumed => panic!("future already consumed"),
        }
    }

    /// Attaches the one-shot continuation for this future, or runs it from
    /// the queue right away when the result is already present.
    fn schedule_continuation(mut self, continuation: Continuation<T>) {
        match mem::replace(&mut self.inner, FutureInner::Consumed) {
            FutureInner::Local(cell) => {
                debug_assert!(cell.available(), "disconnected future with a pending cell");
                executor::enqueue(Task::with_label("continuation", move || continuation(cell)));
            }
            FutureInner::Linked(link) => {
                if link.cell_available() {
                    let cell = link.detach_cell();
                    executor::enqueue(Task::with_label("continuation", move || {
                        continuation(cell);
                    }));
                } else if link.promise_live() {
                    link.attach_continuation(continuation);
                } else {
                    // Abandoned: the promise vanished without settling.
                    let mut cell = link.detach_cell();
                    cell.set_failure(Failure::broken_promise());
                    executor::enqueue(Task::with_label("continuation", move || {
                        continuation(cell);
                    }));
                }
            }
            FutureInner::Consumed => panic!("continuation attached to a consumed future"),
        }
    }

    /// Gets the result, blocking the current fiber if it is not yet
    /// available.
    ///
    /// Returns the value, or the stored failure. Calling `get` on a pending
    /// future outside a fiber context yields a [`FailureKind::NoFiber`]
    /// failure.
    pub fn get(mut self) -> Result<T, Failure> {
        if !self.available() {
            self.do_wait()?;
        }
        self.take_available_cell().take_settled().into_result()
    }

    /// Waits for the future to become available without consuming it.
    ///
    /// Like [`Future::get`] this may only block inside a fiber context.
    pub fn wait(&mut self) -> Result<(), Failure> {
        if self.available() {
            return Ok(());
        }
        self.do_wait()
    }

    /// Moves the failure out of an available, failed future.
    ///
    /// # Panics
    ///
    /// Panics if the future has not failed.
    pub fn take_failure(mut self) -> Failure {
        assert!(self.failed(), "take_failure on a future that has not failed");
        self.take_available_cell().take_failure()
    }

    /// Discards the result, whatever it turns out to be, suppressing the
    /// dropped-failure diagnostic.
    pub fn ignore(mut self) {
        match mem::replace(&mut self.inner, FutureInner::Consumed) {
            FutureInner::Local(mut cell) => cell.ignore(),
            FutureInner::Linked(link) => link.ignore_cell(),
            FutureInner::Consumed => {}
        }
    }

    /// Satisfies `downstream` with this future's outcome.
    ///
    /// If the result is already available, the cell transfers immediately
    /// through the urgent path; otherwise the downstream promise takes over
    /// as this pair's sink and is satisfied directly on fulfilment, with no
    /// extra scheduler hop.
    pub fn forward_to(mut self, mut downstream: Promise<T>) {
        if self.available() {
            let cell = self.take_available_cell();
            downstream.fulfill_with_cell(cell, true);
            return;
        }
        match mem::replace(&mut self.inner, FutureInner::Consumed) {
            FutureInner::Linked(link) => link.attach_forward(downstream),
            // A disconnected future is always available; handled above.
            FutureInner::Local(_) | FutureInner::Consumed => {
                panic!("forward_to on a consumed future")
            }
        }
    }

    /// Schedules `f` to run with this future's value; failures skip `f` and
    /// propagate.
    ///
    /// `f` returns anything the lifter understands: another future, or a
    /// `Result` whose `Err` becomes a ready failure. For infallible plain
    /// returns see [`Future::map`].
    ///
    /// When the result is already available and no preemption is due, `f`
    /// runs inline before `then` returns.
    pub fn then<F, R>(mut self, f: F) -> Future<R::Element>
    where
        F: FnOnce(T) -> R + 'static,
        R: Lift,
    {
        if self.available() && !executor::need_preempt() {
            return match self.take_available_cell().take_settled() {
                Outcome::Value(v) => f(v).lift(),
                Outcome::Failed(e) => ready_failure(e),
            };
        }
        let mut pr = Promise::new();
        let fut = pr.detach_future();
        self.schedule_continuation(Box::new(move |mut cell| {
            match cell.take_settled() {
                Outcome::Value(v) => f(v).lift().forward_to(pr),
                Outcome::Failed(e) => pr.set_failure(e),
            }
        }));
        fut
    }

    /// Schedules `f` to run with this future's plain, infallible mapping.
    ///
    /// The plain-value counterpart of [`Future::then`]: `f` returns the next
    /// value directly. Failures skip `f` and propagate.
    pub fn map<F, U>(mut self, f: F) -> Future<U>
    where
        F: FnOnce(T) -> U + 'static,
    {
        if self.available() && !executor::need_preempt() {
            return match self.take_available_cell().take_settled() {
                Outcome::Value(v) => ready_value(f(v)),
                Outcome::Failed(e) => ready_failure(e),
            };
        }
        let mut pr = Promise::new();
        let fut = pr.detach_future();
        self.schedule_continuation(Box::new(move |mut cell| match cell.take_settled() {
            Outcome::Value(v) => pr.set_value(f(v)),
            Outcome::Failed(e) => pr.set_failure(e),
        }));
        fut
    }

    /// Schedules `f` to run with the settled future itself, value or
    /// failure.
    ///
    /// Unlike [`Future::then`], `f` is always invoked and receives this
    /// future in an available state, so it can dispatch on the outcome.
    pub fn then_wrapped<F, R>(mut self, f: F) -> Future<R::Element>
    where
        F: FnOnce(Future<T>) -> R + 'static,
        R: Lift,
    {
        if self.available() && !executor::need_preempt() {
            let cell = self.take_available_cell();
            return f(Future::from_cell(cell)).lift();
        }
        let mut pr = Promise::new();
        let fut = pr.detach_future();
        self.schedule_continuation(Box::new(move |cell| {
            f(Future::from_cell(cell)).lift().forward_to(pr);
        }));
        fut
    }

    /// Schedules `f` to run after this future settles, regardless of the
    /// outcome.
    ///
    /// If `f` succeeds, the original outcome is forwarded unchanged. If `f`
    /// fails, its failure takes precedence, carrying the original failure
    /// (if any) as its cause.
    pub fn finally<F, R>(self, f: F) -> Future<T>
    where
        F: FnOnce() -> R + 'static,
        R: Lift<Element = ()>,
    {
        self.then_wrapped(move |original: Future<T>| -> Future<T> {
            f().lift()
                .then_wrapped(move |cleanup: Future<()>| -> Future<T> {
                    match cleanup.into_outcome() {
                        Outcome::Value(()) => original,
                        Outcome::Failed(cleanup_failure) => {
                            if original.failed() {
                                let cause = original.take_failure();
                                ready_failure(cleanup_failure.caused_by(cause))
                            } else {
                                original.ignore();
                                ready_failure(cleanup_failure)
                            }
                        }
                    }
                })
        })
    }

    /// Handles a failure by invoking `h` with the failure descriptor; a
    /// value passes through untouched.
    ///
    /// `h` produces the replacement result, immediately (`Result`) or
    /// asynchronously (another future).
    pub fn handle_failure<F, R>(self, h: F) -> Future<T>
    where
        F: FnOnce(Failure) -> R + 'static,
        R: Lift<Element = T>,
    {
        self.then_wrapped(move |fut: Future<T>| -> Future<T> {
            if fut.failed() {
                h(fut.take_failure()).lift()
            } else {
                fut
            }
        })
    }

    /// Like [`Future::handle_failure`], but only for failures of the given
    /// kind; other failures propagate unchanged.
    pub fn handle_failure_of_kind<F, R>(self, kind: FailureKind, h: F) -> Future<T>
    where
        F: FnOnce(Failure) -> R + 'static,
        R: Lift<Element = T>,
    {
        self.then_wrapped(move |fut: Future<T>| -> Future<T> {
            if fut.failed_kind() == Some(kind) {
                h(fut.take_failure()).lift()
            } else {
                fut
            }
        })
    }

    /// Collapses the value to the empty tuple; failures propagate.
    pub fn discard_value(self) -> Future<()> {
        self.map(|_| ())
    }

    /// Terminates the process if this future fails. Use with caution.
    pub fn or_terminate(self) -> Future<()> {
        self.then_wrapped(|fut: Future<T>| -> Future<()> {
            if fut.failed() {
                let failure = fut.take_failure();
                diag::process_exit(&failure);
            }
            fut.ignore();
            ready()
        })
    }

    /// Settles an available future into its outcome.
    fn into_outcome(mut self) -> Outcome<T> {
        self.take_available_cell().take_settled()
    }

    /// The blocking-wait path.
    ///
    /// Installs a one-shot continuation that deposits the settled cell back
    /// into this future and resumes the current fiber, then switches out.
    fn do_wait(&mut self) -> Result<(), Failure> {
        let link = match &self.inner {
            FutureInner::Linked(link) if link.promise_live() => link.clone(),
            FutureInner::Linked(link) => {
                // The promise is gone and never settled the pair.
                let mut cell = link.detach_cell();
                cell.set_failure(Failure::broken_promise());
                self.inner = FutureInner::Local(cell);
                return Ok(());
            }
            FutureInner::Local(_) => return Ok(()),
            FutureInner::Consumed => panic!("wait on a consumed future"),
        };

        let Some(handle) = fiber::current_fiber() else {
            return Err(Failure::no_fiber());
        };

        let slot: Rc<RefCell<Option<ValueCell<T>>>> = Rc::new(RefCell::new(None));
        let deposit = Rc::clone(&slot);
        let wake = handle.clone();
        link.attach_continuation(Box::new(move |cell| {
            *deposit.borrow_mut() = Some(cell);
            fiber::switch_in(&wake);
        }));
        self.inner = FutureInner::Consumed;

        fiber::switch_out(&handle);

        let cell = slot
            .borrow_mut()
            .take()
            .expect("wake continuation ran without delivering the cell");
        self.inner = FutureInner::Local(cell);
        Ok(())
    }
}

impl<T: 'static> Drop for Future<T> {
    fn drop(&mut self) {
        if let FutureInner::Linked(link) = &self.inner {
            link.on_future_drop();
        }
        // A local cell drops with the future; an unobserved failure in it
        // reports through the cell's own drop.
    }
}

impl<T: 'static> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.inner {
            FutureInner::Local(_) => "local",
            FutureInner::Linked(_) => "linked",
            FutureInner::Consumed => "consumed",
        };
        f.debug_struct("Future")
            .field("state", &state)
            .field("available", &self.available())
            .finish()
    }
}
