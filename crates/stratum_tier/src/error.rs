// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::{borrow::Cow, fmt, sync::Arc};

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from a cache operation.
///
/// The error is opaque but classifiable:
///
/// * [`is_invalid_argument`](Self::is_invalid_argument): the call was rejected before any work was scheduled.
/// * [`as_aggregated`](Self::as_aggregated): one or both branches of a composed operation failed.
/// * [`is_cancelled`](Self::is_cancelled): the awaited operation was cancelled before it finished.
/// * anything else is a failure reported by a cache implementation, available through
///   [`std::error::Error::source()`].
///
/// `Error` is cheap to clone so that every observer of a failed operation receives the same value.
///
/// # Examples
///
/// ```
/// use stratum_tier::Error;
///
/// let error = Error::caused_by("connection reset");
/// assert_eq!(error.to_string(), "connection reset");
/// assert!(!error.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct Error(Arc<ErrorKind>);

#[derive(Debug)]
enum ErrorKind {
    InvalidArgument(Cow<'static, str>),
    Cache(Box<dyn std::error::Error + Send + Sync + 'static>),
    Aggregated(AggregatedFailure),
    Cancelled,
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self(Arc::new(kind))
    }

    /// Creates an error for an argument rejected before dispatch.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum_tier::Error;
    ///
    /// let error = Error::invalid_argument("key must be set");
    /// assert!(error.is_invalid_argument());
    /// ```
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::from_kind(ErrorKind::InvalidArgument(message.into()))
    }

    /// Wraps a failure reported by a cache implementation.
    ///
    /// Adapters use this to translate the native error of the library they wrap. The native error
    /// is kept intact and returned by [`source()`](std::error::Error::source).
    pub fn caused_by(cause: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::from_kind(ErrorKind::Cache(cause.into()))
    }

    /// Creates the error observed by waiters of a cancelled operation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::from_kind(ErrorKind::Cancelled)
    }

    /// Creates an error from the branch failures of a fan-out.
    #[must_use]
    pub fn aggregated(failure: AggregatedFailure) -> Self {
        Self::from_kind(ErrorKind::Aggregated(failure))
    }

    /// Returns `true` if the call was rejected before any asynchronous work was scheduled.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(*self.0, ErrorKind::InvalidArgument(_))
    }

    /// Returns `true` if the awaited operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.0, ErrorKind::Cancelled)
    }

    /// Returns the branch failures if this error comes from a composed fan-out.
    #[must_use]
    pub fn as_aggregated(&self) -> Option<&AggregatedFailure> {
        match &*self.0 {
            ErrorKind::Aggregated(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ErrorKind::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            ErrorKind::Cache(err) => err.fmt(f),
            ErrorKind::Aggregated(failure) => failure.fmt(f),
            ErrorKind::Cancelled => f.write_str("operation was cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.0 {
            ErrorKind::InvalidArgument(_) | ErrorKind::Cancelled => None,
            ErrorKind::Cache(err) => Some(err.as_ref()),
            ErrorKind::Aggregated(failure) => Some(failure.cause()),
        }
    }
}

/// The logical operation a composed cache fanned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A read.
    Get,
    /// A write.
    Set,
    /// A removal.
    Evict,
}

impl Operation {
    /// Returns the lowercase operation name used in failure messages and log events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Evict => "evict",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a branch within a composed cache.
///
/// Labels follow dispatch position, never completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    /// The higher-priority cache, consulted first on reads.
    First,
    /// The lower-priority cache.
    Second,
}

impl Branch {
    /// Returns the stable label used in failure messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::First => "firstCache",
            Self::Second => "secondCache",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The failure of one branch of a fan-out.
#[derive(Debug, Clone)]
pub struct BranchFailure {
    branch: Branch,
    error: Error,
}

impl BranchFailure {
    /// Labels `error` with the branch it came from.
    #[must_use]
    pub fn new(branch: Branch, error: Error) -> Self {
        Self { branch, error }
    }

    /// Returns the branch that failed.
    #[must_use]
    pub fn branch(&self) -> Branch {
        self.branch
    }

    /// Returns the error the branch failed with.
    #[must_use]
    pub fn error(&self) -> &Error {
        &self.error
    }
}

/// One or more branch failures collected from a fan-out.
///
/// The message joins `"<operation> failed for <label>"` for every branch, in dispatch order,
/// with `", "`. The proximate cause is the error of the first listed branch.
///
/// # Examples
///
/// ```
/// use std::error::Error as _;
/// use stratum_tier::{AggregatedFailure, Branch, BranchFailure, Error, Operation};
///
/// let failure = AggregatedFailure::new(
///     Operation::Evict,
///     vec![
///         BranchFailure::new(Branch::First, Error::caused_by("disk full")),
///         BranchFailure::new(Branch::Second, Error::caused_by("timed out")),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(failure.to_string(), "evict failed for firstCache, evict failed for secondCache");
/// assert_eq!(failure.cause().to_string(), "disk full");
/// ```
#[derive(Debug, Clone)]
pub struct AggregatedFailure {
    operation: Operation,
    // Never empty.
    failures: Vec<BranchFailure>,
}

impl AggregatedFailure {
    /// Collects branch failures, ordering them by dispatch position.
    ///
    /// Returns `None` when there is nothing to aggregate.
    #[must_use]
    pub fn new(operation: Operation, mut failures: Vec<BranchFailure>) -> Option<Self> {
        if failures.is_empty() {
            return None;
        }
        failures.sort_by_key(BranchFailure::branch);
        Some(Self { operation, failures })
    }

    /// Returns the operation that was fanned out.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the failed branches in dispatch order.
    #[must_use]
    pub fn failures(&self) -> &[BranchFailure] {
        &self.failures
    }

    /// Returns the error of the first failed branch.
    #[must_use]
    pub fn cause(&self) -> &Error {
        // `new` rejects empty lists.
        &self.failures[0].error
    }
}

impl fmt::Display for AggregatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} failed for {}", self.operation, failure.branch)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregatedFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause())
    }
}
