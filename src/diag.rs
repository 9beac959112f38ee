//! Diagnostics for failures that leave the system unobserved.
//!
//! Two escape hatches live here:
//!
//! - [`report_dropped_failure`]: invoked whenever a failure is destroyed
//!   without anyone having observed it (a failed future dropped without
//!   `get`/`ignore`/a handler, or a failure arriving after the consumer is
//!   gone). Each such failure is diagnosed exactly once.
//! - [`process_exit`]: the terminal path used by `Future::or_terminate`.
//!
//! The report feeds a per-thread counter so tests can assert on drop
//! diagnostics without scraping log output.

use crate::failure::Failure;
use std::cell::Cell;

thread_local! {
    static DROPPED_FAILURES: Cell<u64> = const { Cell::new(0) };
}

/// Records a failure that was dropped without observation.
///
/// Emits a `warn` event and bumps the per-thread diagnostic counter.
pub fn report_dropped_failure(failure: &Failure) {
    DROPPED_FAILURES.with(|c| c.set(c.get() + 1));
    tracing::warn!(%failure, "failure dropped without observation");
}

/// Number of dropped-failure diagnostics emitted on this thread.
#[must_use]
pub fn dropped_failure_count() -> u64 {
    DROPPED_FAILURES.with(Cell::get)
}

/// Terminates the process with a failure diagnostic.
///
/// Used by `Future::or_terminate` when the future resolves to a failure.
/// Never returns.
pub fn process_exit(failure: &Failure) -> ! {
    tracing::error!(%failure, "terminating on unhandled failure");
    eprintln!("tether: terminating on unhandled failure: {failure}");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{Failure, FailureKind};

    #[test]
    fn counter_increments_per_report() {
        let before = dropped_failure_count();
        report_dropped_failure(&Failure::new(FailureKind::Io));
        report_dropped_failure(&Failure::new(FailureKind::Timeout));
        assert_eq!(dropped_failure_count(), before + 2);
    }
}
