//! The three-state value cell shared by a promise/future pair.
//!
//! A [`ValueCell`] is the single logical slot behind one hand-off:
//!
//! ```text
//!              set_value
//!   Pending ──────────────► Value(T)  ──take_value──► Consumed
//!      │
//!      │       set_failure
//!      └──────────────────► Failed(f) ──take_failure─► Consumed
//! ```
//!
//! `Consumed` marks a cell whose contents have been moved out (or explicitly
//! ignored); any further transition is a bug in the caller and panics.
//!
//! # Dropped failures
//!
//! A cell dropped while still holding an unobserved failure reports it
//! through [`crate::diag::report_dropped_failure`]. Because the cell itself
//! carries the policy, the diagnostic fires no matter where the cell dies:
//! inside a future body, inside the shared link, or inside a continuation
//! task that was never run.

use crate::diag;
use crate::failure::Failure;
use core::fmt;
use core::mem;

/// The settled projection of a cell: a value or a failure, nothing else.
///
/// Continuations receive the whole cell and settle it into an `Outcome`
/// before dispatching; `get` does the same at the end of a chain.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The computation produced a value.
    Value(T),
    /// The computation failed.
    Failed(Failure),
}

impl<T> Outcome<T> {
    /// Converts into a `Result`, the form most callers want.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Failed(f) => Err(f),
        }
    }
}

/// A single-use slot holding the eventual result of one promise/future pair.
pub struct ValueCell<T> {
    state: CellState<T>,
}

enum CellState<T> {
    Pending,
    Value(T),
    Failed(Failure),
    Consumed,
}

impl<T> ValueCell<T> {
    /// Creates a cell in the pending state.
    #[must_use]
    pub fn new_pending() -> Self {
        Self {
            state: CellState::Pending,
        }
    }

    /// Creates a cell already fulfilled with a value.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self {
            state: CellState::Value(value),
        }
    }

    /// Creates a cell already fulfilled with a failure.
    #[must_use]
    pub fn with_failure(failure: Failure) -> Self {
        Self {
            state: CellState::Failed(failure),
        }
    }

    /// Fulfills the cell with a value.
    ///
    /// # Panics
    ///
    /// Panics if the cell is not pending; fulfilling twice is a bug in the
    /// producer.
    pub fn set_value(&mut self, value: T) {
        assert!(
            matches!(self.state, CellState::Pending),
            "value cell fulfilled twice"
        );
        self.state = CellState::Value(value);
    }

    /// Fulfills the cell with a failure.
    ///
    /// # Panics
    ///
    /// Panics if the cell is not pending.
    pub fn set_failure(&mut self, failure: Failure) {
        assert!(
            matches!(self.state, CellState::Pending),
            "value cell fulfilled twice"
        );
        self.state = CellState::Failed(failure);
    }

    /// Returns true if the cell holds a value or a failure.
    #[must_use]
    pub fn available(&self) -> bool {
        matches!(self.state, CellState::Value(_) | CellState::Failed(_))
    }

    /// Returns true if the cell holds a failure.
    #[must_use]
    pub fn failed(&self) -> bool {
        matches!(self.state, CellState::Failed(_))
    }

    /// Returns true if the cell has not been fulfilled yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, CellState::Pending)
    }

    /// Moves the value out, leaving the cell consumed.
    ///
    /// # Panics
    ///
    /// Panics if the cell does not hold a value.
    pub fn take_value(&mut self) -> T {
        match mem::replace(&mut self.state, CellState::Consumed) {
            CellState::Value(v) => v,
            _ => panic!("take_value on a cell without a value"),
        }
    }

    /// Moves the failure out, leaving the cell consumed.
    ///
    /// # Panics
    ///
    /// Panics if the cell does not hold a failure.
    pub fn take_failure(&mut self) -> Failure {
        match mem::replace(&mut self.state, CellState::Consumed) {
            CellState::Failed(f) => f,
            _ => panic!("take_failure on a cell without a failure"),
        }
    }

    /// Moves the settled contents out, leaving the cell consumed.
    ///
    /// # Panics
    ///
    /// Panics if the cell is pending or already consumed.
    pub fn take_settled(&mut self) -> Outcome<T> {
        match mem::replace(&mut self.state, CellState::Consumed) {
            CellState::Value(v) => Outcome::Value(v),
            CellState::Failed(f) => Outcome::Failed(f),
            _ => panic!("take_settled on an unfulfilled cell"),
        }
    }

    /// Observes the result without consuming it.
    ///
    /// Returns a copy of the value, or the stored failure. Observation via
    /// this method does not count as handling a failure for the purposes of
    /// the dropped-failure diagnostic.
    ///
    /// # Panics
    ///
    /// Panics if the cell is not available.
    pub fn observe(&self) -> Result<T, Failure>
    where
        T: Clone,
    {
        match &self.state {
            CellState::Value(v) => Ok(v.clone()),
            CellState::Failed(f) => Err(f.clone()),
            _ => panic!("observe on an unfulfilled cell"),
        }
    }

    /// Returns the stored failure, if the cell holds one.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match &self.state {
            CellState::Failed(f) => Some(f),
            _ => None,
        }
    }

    /// Discards the contents, suppressing any dropped-failure diagnostic.
    pub fn ignore(&mut self) {
        self.state = CellState::Consumed;
    }

    /// Moves the whole cell out in whatever state it is in, leaving this
    /// slot consumed. This is the primitive behind every cell migration.
    pub(crate) fn take_raw(&mut self) -> Self {
        Self {
            state: mem::replace(&mut self.state, CellState::Consumed),
        }
    }
}

impl<T> Drop for ValueCell<T> {
    fn drop(&mut self) {
        if let CellState::Failed(f) = &self.state {
            diag::report_dropped_failure(f);
        }
    }
}

impl<T> fmt::Debug for ValueCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            CellState::Pending => "pending",
            CellState::Value(_) => "value",
            CellState::Failed(_) => "failed",
            CellState::Consumed => "consumed",
        };
        f.debug_struct("ValueCell").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{Failure, FailureKind};

    #[test]
    fn pending_then_value() {
        let mut cell = ValueCell::new_pending();
        assert!(cell.is_pending());
        assert!(!cell.available());

        cell.set_value(7);
        assert!(cell.available());
        assert!(!cell.failed());
        assert_eq!(cell.take_value(), 7);
        assert!(!cell.available());
    }

    #[test]
    fn pending_then_failure() {
        let mut cell = ValueCell::<i32>::new_pending();
        cell.set_failure(Failure::with_message(FailureKind::Io, "disk"));
        assert!(cell.available());
        assert!(cell.failed());

        let f = cell.take_failure();
        assert_eq!(f.kind(), FailureKind::Io);
    }

    #[test]
    fn observe_clones_without_consuming() {
        let cell = ValueCell::with_value(41);
        assert_eq!(cell.observe().expect("value expected"), 41);
        assert_eq!(cell.observe().expect("value expected"), 41);
    }

    #[test]
    fn take_settled_projects_both_arms() {
        let mut v = ValueCell::with_value(1);
        assert!(matches!(v.take_settled(), Outcome::Value(1)));

        let mut f = ValueCell::<i32>::with_failure(Failure::new(FailureKind::Timeout));
        match f.take_settled() {
            Outcome::Failed(e) => assert_eq!(e.kind(), FailureKind::Timeout),
            Outcome::Value(_) => panic!("expected a failure"),
        }
    }

    #[test]
    #[should_panic(expected = "fulfilled twice")]
    fn double_set_value_panics() {
        let mut cell = ValueCell::new_pending();
        cell.set_value(1);
        cell.set_value(2);
    }

    #[test]
    #[should_panic(expected = "fulfilled twice")]
    fn set_failure_after_value_panics() {
        let mut cell = ValueCell::new_pending();
        cell.set_value(1);
        cell.set_failure(Failure::new(FailureKind::User));
    }

    #[test]
    #[should_panic(expected = "without a value")]
    fn take_value_on_pending_panics() {
        let mut cell = ValueCell::<i32>::new_pending();
        let _ = cell.take_value();
    }

    #[test]
    fn dropping_failed_cell_reports_once() {
        let before = crate::diag::dropped_failure_count();
        drop(ValueCell::<i32>::with_failure(Failure::new(
            FailureKind::Io,
        )));
        assert_eq!(crate::diag::dropped_failure_count(), before + 1);
    }

    #[test]
    fn ignore_suppresses_report() {
        let before = crate::diag::dropped_failure_count();
        let mut cell = ValueCell::<i32>::with_failure(Failure::new(FailureKind::Io));
        cell.ignore();
        drop(cell);
        assert_eq!(crate::diag::dropped_failure_count(), before);
    }

    #[test]
    fn taken_failure_is_not_reported() {
        let before = crate::diag::dropped_failure_count();
        let mut cell = ValueCell::<i32>::with_failure(Failure::new(FailureKind::Io));
        let _f = cell.take_failure();
        drop(cell);
        assert_eq!(crate::diag::dropped_failure_count(), before);
    }

    #[test]
    fn empty_element_adds_no_payload() {
        // An empty element type must not grow the cell beyond what the
        // failure arm already requires.
        assert_eq!(
            std::mem::size_of::<ValueCell<()>>(),
            std::mem::size_of::<ValueCell<Failure>>()
        );
    }
}
