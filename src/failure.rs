//! Failure descriptors and the failure taxonomy.
//!
//! A [`Failure`] is the opaque, pointer-sized handle a promise stores when an
//! asynchronous computation fails. It carries:
//!
//! - a [`FailureKind`] discriminant (no stringly-typed errors),
//! - optional human-readable context,
//! - an optional underlying `std::error::Error` source,
//! - an optional *cause chain* of earlier failures.
//!
//! The cause chain is what keeps causality intact when a cleanup step fails
//! on top of an already-failed computation: the new failure is prepended and
//! the original remains reachable through [`Failure::root_cause`].
//!
//! Cloning a `Failure` is cheap (one `Arc` bump); the same descriptor may be
//! observed, logged, and re-surfaced without copying its payload.

use core::fmt;
use std::sync::Arc;

/// The kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    // === Surfaced by the core itself ===
    /// The promise was destroyed while pending and a consumer existed.
    BrokenPromise,
    /// `get`/`wait` was called on a pending future outside a fiber context.
    NoFiber,

    // === Transparent (carried for the user, never inspected by the core) ===
    /// An I/O error.
    Io,
    /// A deadline or timeout expired.
    Timeout,
    /// The operation was cancelled by its owner.
    Cancelled,
    /// A user-defined failure.
    User,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BrokenPromise => "broken promise",
            Self::NoFiber => "no fiber context",
            Self::Io => "I/O error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::User => "user failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct FailureInner {
    kind: FailureKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    cause: Option<Failure>,
}

/// An opaque, type-erased failure descriptor.
///
/// Exactly one machine word wide: the whole payload lives behind a single
/// `Arc`, so storing a `Failure` in a value cell costs the same as storing a
/// pointer.
#[derive(Clone)]
pub struct Failure(Arc<FailureInner>);

impl Failure {
    /// Creates a new failure of the given kind.
    #[must_use]
    pub fn new(kind: FailureKind) -> Self {
        Self(Arc::new(FailureInner {
            kind,
            message: None,
            source: None,
            cause: None,
        }))
    }

    /// Creates a failure of the given kind with a message.
    #[must_use]
    pub fn with_message(kind: FailureKind, message: impl Into<String>) -> Self {
        Self(Arc::new(FailureInner {
            kind,
            message: Some(message.into()),
            source: None,
            cause: None,
        }))
    }

    /// Wraps an arbitrary error as a transparent failure.
    #[must_use]
    pub fn from_error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(FailureInner {
            kind: FailureKind::User,
            message: Some(err.to_string()),
            source: Some(Arc::new(err)),
            cause: None,
        }))
    }

    /// The broken-promise failure synthesized when a promise is dropped
    /// while pending with a live consumer.
    #[must_use]
    pub fn broken_promise() -> Self {
        Self::with_message(
            FailureKind::BrokenPromise,
            "promise dropped before a value or failure was set",
        )
    }

    pub(crate) fn no_fiber() -> Self {
        Self::with_message(
            FailureKind::NoFiber,
            "blocking wait requires a fiber context",
        )
    }

    /// Returns a copy of this failure with `cause` attached as the next
    /// link of the cause chain.
    ///
    /// Used by `finally`: a failure raised during cleanup takes precedence
    /// but must keep the original failure reachable.
    #[must_use]
    pub fn caused_by(&self, cause: Failure) -> Self {
        Self(Arc::new(FailureInner {
            kind: self.0.kind,
            message: self.0.message.clone(),
            source: self.0.source.clone(),
            cause: Some(cause),
        }))
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.0.kind
    }

    /// Returns true if this failure is of the given kind.
    #[must_use]
    pub fn is_kind(&self, kind: FailureKind) -> bool {
        self.0.kind == kind
    }

    /// Returns the attached message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.0.message.as_deref()
    }

    /// Returns the immediate cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Failure> {
        self.0.cause.as_ref()
    }

    /// Walks the cause chain and returns its last link.
    ///
    /// A failure with no cause is its own root.
    #[must_use]
    pub fn root_cause(&self) -> &Failure {
        let mut cur = self;
        while let Some(cause) = cur.cause() {
            cur = cause;
        }
        cur
    }

    /// Returns true if this failure or any failure in its cause chain is of
    /// the given kind.
    #[must_use]
    pub fn chain_contains(&self, kind: FailureKind) -> bool {
        let mut cur = Some(self);
        while let Some(f) = cur {
            if f.is_kind(kind) {
                return true;
            }
            cur = f.cause();
        }
        false
    }

    /// Returns true if two handles refer to the same descriptor.
    #[must_use]
    pub fn same_descriptor(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.kind)?;
        if let Some(msg) = &self.0.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Failure");
        d.field("kind", &self.0.kind);
        if let Some(msg) = &self.0.message {
            d.field("message", msg);
        }
        if let Some(cause) = &self.0.cause {
            d.field("cause", cause);
        }
        d.finish_non_exhaustive()
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Some(cause) = &self.0.cause {
            return Some(cause);
        }
        self.0
            .source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
