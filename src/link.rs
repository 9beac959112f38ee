//! The migration link between a live promise and its live future.
//!
//! A promise/future pair maintains one logical value cell. The cell lives in
//! exactly one place at a time:
//!
//! - in the promise-local slot, before a future has been detached;
//! - in the link, while the pair is connected;
//! - in the future body, once the pair disconnects with a settled result;
//! - in a continuation task, after a continuation takes the cell out of the
//!   link on fulfilment.
//!
//! Rust moves are bit-copies, so the back-pointer fix-ups a moving pair
//! would otherwise need are replaced by this single shared, single-threaded
//! allocation: moving a [`crate::Promise`] or [`crate::Future`] moves an
//! `Rc` handle and can never invalidate the cell. The two liveness flags
//! stand in for the non-owning back-pointers: each side flips its flag on
//! drop so the other side knows whether anyone is still listening.
//!
//! The *sink* is what fulfilment feeds. At most one sink is ever attached
//! over the lifetime of a pair: either a continuation (which runs as a
//! scheduled task owning the settled cell) or a forwarding promise (which
//! receives the cell directly, with no extra scheduler hop).

use crate::cell::ValueCell;
use crate::executor;
use crate::failure::Failure;
use crate::promise::Promise;
use crate::task::Task;
use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

/// A one-shot continuation, invoked with the settled cell.
pub(crate) type Continuation<T> = Box<dyn FnOnce(ValueCell<T>)>;

/// Where fulfilment delivers the settled cell.
pub(crate) enum Sink<T: 'static> {
    /// Run a continuation as a scheduled task.
    Continuation(Continuation<T>),
    /// Transfer the cell into a downstream promise (urgent path).
    Forward(Promise<T>),
}

pub(crate) struct LinkState<T: 'static> {
    /// The authoritative cell while the pair is connected.
    cell: ValueCell<T>,
    sink: Option<Sink<T>>,
    promise_live: bool,
    future_live: bool,
    /// Set when the consumer ignored the result before fulfilment; a later
    /// failure is then discarded without a dropped-failure diagnostic.
    ignored: bool,
}

/// Shared handle to the link state. Cloning is cheap; all clones refer to
/// the same authoritative cell.
pub(crate) struct Link<T: 'static>(Rc<RefCell<LinkState<T>>>);

impl<T: 'static> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: 'static> Link<T> {
    /// Creates a link owning the given cell.
    pub(crate) fn new(cell: ValueCell<T>) -> Self {
        Self(Rc::new(RefCell::new(LinkState {
            cell,
            sink: None,
            promise_live: true,
            future_live: true,
            ignored: false,
        })))
    }

    pub(crate) fn promise_live(&self) -> bool {
        self.0.borrow().promise_live
    }

    pub(crate) fn cell_available(&self) -> bool {
        self.0.borrow().cell.available()
    }

    pub(crate) fn cell_failed(&self) -> bool {
        self.0.borrow().cell.failed()
    }

    pub(crate) fn cell_failure_kind(&self) -> Option<crate::failure::FailureKind> {
        self.0.borrow().cell.failure().map(Failure::kind)
    }

    /// Takes the cell out of the link, disconnecting the future side.
    pub(crate) fn detach_cell(&self) -> ValueCell<T> {
        let mut st = self.0.borrow_mut();
        st.future_live = false;
        st.cell.take_raw()
    }

    /// Marks the consumer side gone.
    pub(crate) fn on_future_drop(&self) {
        self.0.borrow_mut().future_live = false;
    }

    /// Marks the consumer side gone and discards whatever result exists or
    /// later arrives, without a dropped-failure diagnostic.
    pub(crate) fn ignore_cell(&self) {
        let mut st = self.0.borrow_mut();
        st.future_live = false;
        st.ignored = true;
        if st.cell.available() {
            st.cell.ignore();
        }
    }

    /// Attaches a continuation. The cell must still be pending and no sink
    /// may already be present.
    ///
    /// # Panics
    ///
    /// Panics on a second attachment; a future carries at most one
    /// continuation over its lifetime.
    pub(crate) fn attach_continuation(&self, continuation: Continuation<T>) {
        let mut st = self.0.borrow_mut();
        assert!(
            st.sink.is_none(),
            "a continuation is already attached to this future"
        );
        debug_assert!(
            st.cell.is_pending(),
            "continuation attached to a settled cell"
        );
        st.future_live = false;
        st.sink = Some(Sink::Continuation(continuation));
        tracing::trace!("continuation attached");
    }

    /// Attaches a forwarding promise as the sink.
    ///
    /// # Panics
    ///
    /// Panics if a sink is already present.
    pub(crate) fn attach_forward(&self, downstream: Promise<T>) {
        let mut st = self.0.borrow_mut();
        assert!(
            st.sink.is_none(),
            "a continuation is already attached to this future"
        );
        st.future_live = false;
        st.sink = Some(Sink::Forward(downstream));
        tracing::trace!("forwarding sink attached");
    }

    /// Fulfils the link's cell with a value and dispatches to the sink.
    pub(crate) fn fulfill_value(&self, value: T) {
        {
            let mut st = self.0.borrow_mut();
            st.cell.set_value(value);
            if !st.future_live && st.sink.is_none() {
                // Nobody will ever observe this value.
                tracing::trace!("value set after the future was dropped");
                st.cell.ignore();
                return;
            }
        }
        self.make_ready(false);
    }

    /// Fulfils the link's cell with a failure and dispatches to the sink.
    pub(crate) fn fulfill_failure(&self, failure: Failure) {
        {
            let mut st = self.0.borrow_mut();
            st.cell.set_failure(failure);
            if st.ignored {
                st.cell.ignore();
                return;
            }
        }
        self.make_ready(false);
    }

    /// Fulfils the link's cell by transplanting an already-settled cell.
    /// Used by the forwarding path.
    pub(crate) fn fulfill_cell(&self, cell: ValueCell<T>, urgent: bool) {
        {
            let mut st = self.0.borrow_mut();
            assert!(st.cell.is_pending(), "promise fulfilled twice");
            st.cell = cell;
            if st.ignored {
                st.cell.ignore();
                return;
            }
        }
        self.make_ready(urgent);
    }

    /// Dispatches a settled cell to the attached sink, if any.
    ///
    /// With a continuation attached, the cell migrates into a task which is
    /// enqueued — on the urgent lane iff the fulfilment came through the
    /// urgent path and no preemption is due. With a forwarding sink, the
    /// cell transfers straight into the downstream promise. With no sink the
    /// cell stays in the link for later observation.
    pub(crate) fn make_ready(&self, urgent: bool) {
        let sink = self.0.borrow_mut().sink.take();
        match sink {
            None => {}
            Some(Sink::Continuation(continuation)) => {
                let cell = self.0.borrow_mut().cell.take_raw();
                let task = Task::with_label("continuation", move || continuation(cell));
                if urgent && !executor::need_preempt() {
                    executor::enqueue_urgent(task);
                } else {
                    executor::enqueue(task);
                }
            }
            Some(Sink::Forward(mut downstream)) => {
                let cell = self.0.borrow_mut().cell.take_raw();
                downstream.fulfill_with_cell(cell, true);
            }
        }
    }

    /// Producer-side drop handling: a promise dying while the cell is still
    /// pending, with anyone listening, breaks the promise.
    pub(crate) fn on_promise_drop(&self) {
        let settle = {
            let mut st = self.0.borrow_mut();
            st.promise_live = false;
            st.cell.is_pending() && (st.future_live || st.sink.is_some())
        };
        if settle {
            tracing::debug!("promise dropped while pending; breaking it");
            self.fulfill_failure(Failure::broken_promise());
        }
    }
}

impl<T: 'static> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.0.borrow();
        f.debug_struct("Link")
            .field("cell", &st.cell)
            .field("has_sink", &st.sink.is_some())
            .field("promise_live", &st.promise_live)
            .field("future_live", &st.future_live)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;
    use std::cell::Cell;

    #[test]
    fn continuation_receives_settled_cell() {
        let link = Link::new(ValueCell::new_pending());
        let seen = Rc::new(Cell::new(0));
        let seen2 = Rc::clone(&seen);
        link.attach_continuation(Box::new(move |mut cell| {
            seen2.set(cell.take_value());
        }));

        link.fulfill_value(5);
        assert_eq!(seen.get(), 0, "continuation must not run before the tick");
        executor::run_pending();
        assert_eq!(seen.get(), 5);
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn second_continuation_panics() {
        let link = Link::<i32>::new(ValueCell::new_pending());
        link.attach_continuation(Box::new(|_| {}));
        link.attach_continuation(Box::new(|_| {}));
    }

    #[test]
    fn no_sink_leaves_cell_in_link() {
        let link = Link::new(ValueCell::new_pending());
        link.fulfill_value(3);
        assert!(link.cell_available());
        assert_eq!(link.detach_cell().take_value(), 3);
    }

    #[test]
    fn value_after_future_drop_is_discarded_silently() {
        let before = crate::diag::dropped_failure_count();
        let link = Link::new(ValueCell::new_pending());
        link.on_future_drop();
        link.fulfill_value(3);
        drop(link);
        assert_eq!(crate::diag::dropped_failure_count(), before);
    }

    #[test]
    fn failure_after_future_drop_is_diagnosed() {
        let before = crate::diag::dropped_failure_count();
        let link = Link::<i32>::new(ValueCell::new_pending());
        link.on_future_drop();
        link.fulfill_failure(Failure::new(FailureKind::Io));
        drop(link);
        assert_eq!(crate::diag::dropped_failure_count(), before + 1);
    }

    #[test]
    fn ignored_link_swallows_late_failure() {
        let before = crate::diag::dropped_failure_count();
        let link = Link::<i32>::new(ValueCell::new_pending());
        link.ignore_cell();
        link.fulfill_failure(Failure::new(FailureKind::Io));
        drop(link);
        assert_eq!(crate::diag::dropped_failure_count(), before);
    }

    #[test]
    fn promise_drop_breaks_pending_cell() {
        let link = Link::<i32>::new(ValueCell::new_pending());
        link.on_promise_drop();
        assert!(link.cell_failed());
        assert_eq!(link.cell_failure_kind(), Some(FailureKind::BrokenPromise));
        // Consume the synthesized failure so the drop is clean.
        let _ = link.detach_cell().take_failure();
    }

    #[test]
    fn promise_drop_with_nobody_listening_is_quiet() {
        let before = crate::diag::dropped_failure_count();
        let link = Link::<i32>::new(ValueCell::new_pending());
        link.on_future_drop();
        link.on_promise_drop();
        drop(link);
        assert_eq!(crate::diag::dropped_failure_count(), before);
    }
}
