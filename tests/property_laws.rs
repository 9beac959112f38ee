//! Property tests for the hand-off core.
//!
//! Quantified invariants, verified with `proptest`:
//!
//! - a continuation attached to a future runs exactly once
//! - `set_value(v)` round-trips through `get` element-wise
//! - the failure surfaced by `get` has the original descriptor as its
//!   root cause
//! - destroying a pending promise yields broken-promise
//! - the lifter converts synchronous failures into ready failures
//! - moving either half of the pair never loses the outcome
//! - normal-lane tasks run in enqueue order
//! - `then` on an available future runs the callable inline when no
//!   preemption is due
//! - urgent tasks run before already-queued normal tasks
//! - a failed future destroyed unobserved is diagnosed exactly once
//!
//! Round-trip laws:
//!
//! - `ready_value(v).get() == v`
//! - `ready_value(v).then(f).get() == f(v)` for pure synchronous `f`
//! - `ready_failure(e).handle_failure(h).get() == h(e).get()`
//! - `p.detach_future().then(f).forward_to(q)` then `p.set_value(v)`
//!   makes `q`'s future yield `f(v)`

mod common;

use common::init_test_logging;
use proptest::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use tether::{
    executor, lift, ready_failure, ready_value, Failure, FailureKind, Promise, Task,
};

/// Generates arbitrary transparent failure kinds.
fn arb_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Io),
        Just(FailureKind::Timeout),
        Just(FailureKind::Cancelled),
        Just(FailureKind::User),
    ]
}

/// Generates arbitrary failure descriptors.
fn arb_failure() -> impl Strategy<Value = Failure> {
    (arb_kind(), "[a-z]{0,12}").prop_map(|(kind, msg)| Failure::with_message(kind, msg))
}

proptest! {
    // The continuation fires exactly once, whether the value arrives
    // before or after attachment.
    #[test]
    fn continuation_runs_exactly_once(value: i32, fulfil_first: bool) {
        init_test_logging();
        let runs = Rc::new(Cell::new(0u32));
        let runs2 = Rc::clone(&runs);

        let mut promise = Promise::new();
        let fut = promise.detach_future();
        if fulfil_first {
            promise.set_value(value);
        }
        let out = fut.map(move |v: i32| {
            runs2.set(runs2.get() + 1);
            v
        });
        if !fulfil_first {
            promise.set_value(value);
        }
        executor::run_pending();

        prop_assert_eq!(runs.get(), 1);
        prop_assert_eq!(out.get().expect("value expected"), value);
    }

    // Value integrity through the pair.
    #[test]
    fn value_round_trips(values: Vec<i32>) {
        init_test_logging();
        let mut promise = Promise::new();
        let fut = promise.detach_future();
        promise.set_value(values.clone());
        prop_assert_eq!(fut.get().expect("value expected"), values);
    }

    // The surfaced failure's root cause is the original descriptor.
    #[test]
    fn failure_descriptor_preserved(failure in arb_failure()) {
        init_test_logging();
        let mut promise = Promise::<i32>::new();
        let fut = promise.detach_future();
        promise.set_failure(failure.clone());

        let surfaced = fut.get().expect_err("failure expected");
        prop_assert!(surfaced.root_cause().same_descriptor(&failure));
    }

    // A promise dropped while pending breaks, no matter when the
    // consumer looks.
    #[test]
    fn dropped_promise_breaks(observe_late: bool) {
        init_test_logging();
        let mut promise = Promise::<u64>::new();
        let fut = promise.detach_future();
        drop(promise);
        if observe_late {
            executor::run_pending();
        }
        let err = fut.get().expect_err("broken promise expected");
        prop_assert_eq!(err.kind(), FailureKind::BrokenPromise);
    }

    // A synchronously failing callable lifts to a ready failure with
    // the same root cause.
    #[test]
    fn lifter_catches_sync_failures(failure in arb_failure()) {
        init_test_logging();
        let thrown = failure.clone();
        let fut = lift(move || -> Result<i32, Failure> { Err(thrown) });
        prop_assert!(fut.available());
        let surfaced = fut.get().expect_err("failure expected");
        prop_assert!(surfaced.root_cause().same_descriptor(&failure));
    }

    // An arbitrary interleaving of moves of both halves never loses
    // the outcome.
    #[test]
    fn move_stability(value: i32, moves in proptest::collection::vec(any::<bool>(), 0..8)) {
        init_test_logging();
        let mut promise = Promise::new();
        let mut fut = promise.detach_future();

        for move_promise in moves {
            if move_promise {
                let boxed = Box::new(promise);
                promise = *boxed;
            } else {
                let boxed = Box::new(fut);
                fut = *boxed;
            }
        }

        promise.set_value(value);
        prop_assert_eq!(fut.get().expect("value expected"), value);
    }

    // Normal-lane FIFO.
    #[test]
    fn enqueue_order_is_run_order(ids in proptest::collection::vec(any::<u16>(), 0..16)) {
        init_test_logging();
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));
        for id in &ids {
            let id = *id;
            let log = Rc::clone(&log);
            executor::enqueue(Task::new(move || log.borrow_mut().push(id)));
        }
        executor::run_pending();
        prop_assert_eq!(&*log.borrow(), &ids);
    }

    // Inline-when-available.
    #[test]
    fn then_inlines_when_available(value: i32) {
        init_test_logging();
        let ran = Rc::new(Cell::new(false));
        let ran2 = Rc::clone(&ran);
        let fut = ready_value(value).then(move |v: i32| {
            ran2.set(true);
            Ok::<_, Failure>(v)
        });
        prop_assert!(ran.get());
        prop_assert_eq!(fut.get().expect("value expected"), value);
    }

    // An urgent task overtakes all queued normal tasks.
    #[test]
    fn urgent_precedence(normals in proptest::collection::vec(any::<u16>(), 1..8)) {
        init_test_logging();
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));
        for id in &normals {
            let id = *id;
            let log = Rc::clone(&log);
            executor::enqueue(Task::new(move || log.borrow_mut().push(Some(id))));
        }
        let log2 = Rc::clone(&log);
        executor::enqueue_urgent(Task::new(move || log2.borrow_mut().push(None)));

        executor::run_pending();
        prop_assert_eq!(log.borrow().first().copied(), Some(None));
        prop_assert_eq!(log.borrow().len(), normals.len() + 1);
    }

    // Exactly one diagnostic per unobserved failure.
    #[test]
    fn dropped_failure_diagnosed_once(failure in arb_failure()) {
        init_test_logging();
        let before = tether::diag::dropped_failure_count();
        drop(ready_failure::<i32>(failure));
        prop_assert_eq!(tether::diag::dropped_failure_count(), before + 1);
    }

    // Law: ready_value round-trips.
    #[test]
    fn law_ready_value_get(value: i64) {
        init_test_logging();
        prop_assert_eq!(ready_value(value).get().expect("value expected"), value);
    }

    // Law: then on a ready value applies the pure function.
    #[test]
    fn law_then_applies(value: i32, delta: i32) {
        init_test_logging();
        let fut = ready_value(value)
            .then(move |v: i32| Ok::<_, Failure>(v.wrapping_add(delta)));
        prop_assert_eq!(
            fut.get().expect("value expected"),
            value.wrapping_add(delta)
        );
    }

    // Law: handle_failure replaces a failed result with the handler's.
    #[test]
    fn law_handle_failure(failure in arb_failure(), replacement: i32) {
        init_test_logging();
        let fut = ready_failure::<i32>(failure)
            .handle_failure(move |_| Ok::<_, Failure>(replacement));
        prop_assert_eq!(fut.get().expect("value expected"), replacement);
    }

    // Law: then + forward_to satisfies the downstream pair with f(v).
    #[test]
    fn law_forward_law(value: i32, delta: i32) {
        init_test_logging();
        let mut p = Promise::new();
        let mut q = Promise::new();
        let out = q.detach_future();

        p.detach_future()
            .then(move |v: i32| Ok::<_, Failure>(v.wrapping_add(delta)))
            .forward_to(q);

        p.set_value(value);
        executor::run_pending();
        prop_assert_eq!(
            out.get().expect("value expected"),
            value.wrapping_add(delta)
        );
    }
}
