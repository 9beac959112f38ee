//! The producer half of a hand-off pair.
//!
//! A [`Promise`] owns a local pending cell until [`Promise::detach_future`]
//! connects it to a consumer; from then on fulfilment goes through the
//! shared migration link. A promise is single-use: one
//! future may be detached, and the pair settles exactly once.
//!
//! # Broken promises
//!
//! Dropping a promise that is still pending while a consumer exists (a live
//! future, or an attached continuation waiting for the result) fulfils the
//! pair with the *broken-promise* failure before the promise finishes
//! tearing down. That is the only way to "cancel" a hand-off.
//!
//! # Example
//!
//! ```
//! use tether::{executor, Promise};
//!
//! let mut promise = Promise::new();
//! let future = promise.detach_future();
//! let doubled = future.map(|x: i32| x * 2);
//!
//! promise.set_value(21);
//! executor::run_pending();
//! assert_eq!(doubled.get().expect("value expected"), 42);
//! ```

use crate::cell::ValueCell;
use crate::failure::Failure;
use crate::future::Future;
use crate::link::Link;
use core::fmt;
use core::mem;

/// The producer handle: makes a future's value available at a later time.
pub struct Promise<T: 'static> {
    inner: PromiseInner<T>,
}

enum PromiseInner<T: 'static> {
    /// No future detached yet; the result parks in a promise-local cell.
    Local(ValueCell<T>),
    /// A future was detached; the authoritative cell lives in the link.
    Linked(Link<T>),
    /// Nothing left to do: the pair disconnected with a settled result.
    Detached,
}

impl<T: 'static> Promise<T> {
    /// Creates a promise with a pending local cell and no consumer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: PromiseInner::Local(ValueCell::new_pending()),
        }
    }

    /// Detaches the consumer-side future, connecting the pair.
    ///
    /// May be called at most once. If the promise was already fulfilled
    /// (value set before detaching), the returned future is immediately
    /// available and disconnected; otherwise promise and future share the
    /// migration link until the pair settles.
    ///
    /// # Panics
    ///
    /// Panics if a future has already been detached.
    pub fn detach_future(&mut self) -> Future<T> {
        match mem::replace(&mut self.inner, PromiseInner::Detached) {
            PromiseInner::Local(cell) => {
                if cell.available() {
                    tracing::trace!("future detached with a pre-settled cell");
                    Future::from_cell(cell)
                } else {
                    let link = Link::new(cell);
                    self.inner = PromiseInner::Linked(link.clone());
                    Future::from_link(link)
                }
            }
            PromiseInner::Linked(_) | PromiseInner::Detached => {
                panic!("a future was already detached from this promise")
            }
        }
    }

    /// Fulfils the pair with a value.
    ///
    /// Before `detach_future` this writes to the promise-local cell; after,
    /// it writes to the authoritative cell and dispatches any attached
    /// continuation.
    ///
    /// # Panics
    ///
    /// Panics if the pair has already been fulfilled.
    pub fn set_value(&mut self, value: T) {
        match &mut self.inner {
            PromiseInner::Local(cell) => cell.set_value(value),
            PromiseInner::Linked(link) => link.fulfill_value(value),
            PromiseInner::Detached => panic!("promise already fulfilled"),
        }
    }

    /// Fulfils the pair with a failure.
    ///
    /// # Panics
    ///
    /// Panics if the pair has already been fulfilled.
    pub fn set_failure(&mut self, failure: Failure) {
        match &mut self.inner {
            PromiseInner::Local(cell) => cell.set_failure(failure),
            PromiseInner::Linked(link) => link.fulfill_failure(failure),
            PromiseInner::Detached => panic!("promise already fulfilled"),
        }
    }

    /// Fulfils the pair by transplanting an already-settled cell, taking the
    /// urgent scheduling path. This is how `forward_to` satisfies a
    /// downstream promise.
    pub(crate) fn fulfill_with_cell(&mut self, cell: ValueCell<T>, urgent: bool) {
        match &mut self.inner {
            PromiseInner::Local(local) => {
                assert!(local.is_pending(), "promise already fulfilled");
                *local = cell;
            }
            PromiseInner::Linked(link) => link.fulfill_cell(cell, urgent),
            PromiseInner::Detached => panic!("promise already fulfilled"),
        }
    }
}

impl<T: 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        if let PromiseInner::Linked(link) = &self.inner {
            link.on_promise_drop();
        }
        // A local cell drops with the promise; an unobserved failure in it
        // reports through the cell's own drop.
    }
}

impl<T: 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.inner {
            PromiseInner::Local(_) => "local",
            PromiseInner::Linked(_) => "linked",
            PromiseInner::Detached => "detached",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}
