//! Tether: a single-threaded promise/future hand-off core with explicit
//! continuation scheduling.
//!
//! # Overview
//!
//! A [`Promise`] and its [`Future`] are the writer and reader sides of a
//! single-item, single-use queue. The producer detaches a future, hands it
//! to consumer code, and later fulfils the pair with a value or a
//! [`Failure`]; the consumer observes the result directly or chains
//! continuations onto it. One logical value cell backs each pair, and the
//! migration protocol guarantees it lives in exactly one place at any
//! instant — promise, link, future body, or continuation task.
//!
//! # Core Guarantees
//!
//! - **Single use**: one future per promise, one fulfilment per pair, at
//!   most one continuation per future.
//! - **No silent drops**: a failure nobody observed is diagnosed through
//!   [`diag::report_dropped_failure`] exactly once; dropping a pending
//!   promise surfaces as the *broken-promise* failure, never as a hang.
//! - **Bounded inlining**: ready-chain continuations run inline only while
//!   [`executor::need_preempt`] stays clear, so long chains cannot starve
//!   queued work.
//! - **Single-threaded**: every pair lives on one executor thread; there
//!   are no locks and no atomics on the hot path.
//!
//! # Module Structure
//!
//! - [`cell`]: the three-state value cell and its settled projection
//! - `link` (internal): the migration link tracking where the cell lives
//! - [`promise`]: the producer handle
//! - [`future`]: the consumer handle and its combinators
//! - [`lift`]: type-directed lifting of continuation results
//! - [`task`]: type-erased units of scheduled work
//! - [`executor`]: the two-lane cooperative run queue
//! - [`fiber`]: the blocking-wait bridge
//! - [`failure`]: failure descriptors and the failure taxonomy
//! - [`diag`]: dropped-failure diagnostics and process exit
//!
//! # Example
//!
//! ```
//! use tether::{executor, Failure, Promise};
//!
//! let mut promise = Promise::new();
//! let done = promise
//!     .detach_future()
//!     .then(|n: i32| Ok::<_, Failure>(n + 1))
//!     .map(|n| n.to_string());
//!
//! promise.set_value(41);
//! executor::run_pending();
//! assert_eq!(done.get().expect("value expected"), "42");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cell;
pub mod diag;
pub mod executor;
pub mod failure;
pub mod fiber;
pub mod future;
pub mod lift;
mod link;
pub mod promise;
pub mod task;

pub use cell::{Outcome, ValueCell};
pub use failure::{Failure, FailureKind};
pub use fiber::FiberHandle;
pub use future::{ready, ready_failure, ready_failure_of, ready_value, Future};
pub use lift::{lift, lift_with, IsAsync, Lift, Lifted};
pub use promise::Promise;
pub use task::Task;
