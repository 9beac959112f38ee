//! Type-directed lifting of continuation results into futures.
//!
//! The [`Lift`] trait is the lynchpin of uniform composition: whatever shape
//! a continuation returns, lifting normalizes it into a future of the
//! appropriate element type, and a synchronous failure never escapes the
//! call site — it becomes a ready failure instead.
//!
//! Three result shapes exist:
//!
//! | shape | rendering | lifted as |
//! |---|---|---|
//! | already asynchronous | `Future<T>` | itself |
//! | plain, may fail synchronously | `Result<T, E>` | ready value / ready failure |
//! | plain, infallible (incl. empty) | [`crate::Future::map`] | ready value |
//!
//! A blanket implementation over every plain type would overlap the first
//! two, so the infallible-plain arm lives on `map` rather than on this
//! trait; the type system still dispatches the other two without
//! annotations.

use crate::failure::Failure;
use crate::future::{ready_failure, ready_value, Future};

/// Types a continuation may return, together with their lifting into a
/// future.
pub trait Lift {
    /// The element type of the lifted future.
    type Element: 'static;

    /// Lifts the result into a future.
    fn lift(self) -> Future<Self::Element>;
}

impl<T: 'static> Lift for Future<T> {
    type Element = T;

    fn lift(self) -> Future<T> {
        self
    }
}

impl<T: 'static, E: Into<Failure>> Lift for Result<T, E> {
    type Element = T;

    fn lift(self) -> Future<T> {
        match self {
            Ok(value) => ready_value(value),
            Err(failure) => ready_failure(failure.into()),
        }
    }
}

/// The lifted future type of a continuation result.
pub type Lifted<R> = Future<<R as Lift>::Element>;

/// Marker for result shapes that are already asynchronous containers.
pub trait IsAsync: Lift {}

impl<T: 'static> IsAsync for Future<T> {}

/// Calls `f` and lifts its result.
///
/// A synchronous failure (an `Err` return) becomes a ready failure; it is
/// never propagated out of this call.
pub fn lift<R, F>(f: F) -> Lifted<R>
where
    F: FnOnce() -> R,
    R: Lift,
{
    f().lift()
}

/// Calls `f` with the given arguments (as a tuple or single value) and
/// lifts its result.
pub fn lift_with<A, R, F>(f: F, args: A) -> Lifted<R>
where
    F: FnOnce(A) -> R,
    R: Lift,
{
    f(args).lift()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;

    #[test]
    fn lifts_a_future_to_itself() {
        let fut = lift(|| ready_value(5));
        assert_eq!(fut.get().expect("value expected"), 5);
    }

    #[test]
    fn lifts_ok_to_ready_value() {
        let fut = lift(|| Ok::<_, Failure>("done"));
        assert_eq!(fut.get().expect("value expected"), "done");
    }

    #[test]
    fn lifts_err_to_ready_failure() {
        let fut = lift(|| -> Result<i32, Failure> {
            Err(Failure::with_message(FailureKind::User, "boom"))
        });
        let err = fut.get().expect_err("failure expected");
        assert_eq!(err.kind(), FailureKind::User);
        assert_eq!(err.message(), Some("boom"));
    }

    #[test]
    fn lift_with_passes_arguments() {
        let fut = lift_with(|(a, b): (i32, i32)| Ok::<_, Failure>(a + b), (2, 3));
        assert_eq!(fut.get().expect("value expected"), 5);
    }

    #[test]
    fn empty_form_lifts_to_ready_unit() {
        let fut = lift(|| Ok::<(), Failure>(()));
        assert!(fut.available());
        fut.get().expect("value expected");
    }
}
