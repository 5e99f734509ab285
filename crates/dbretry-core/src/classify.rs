//! Failure classification.
//!
//! The retry engine never inspects driver errors directly. Each error type
//! exposes an [`ErrorDescription`] through [`DescribeError`], and a
//! [`Classifier`] maps that description to a [`Classification`]. Drivers
//! supply their own transient-error sets without touching the engine.
//!
//! Anything a classifier does not recognize is [`Classification::Fatal`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io;

/// Broad category of a database failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The connection was reset, aborted or dropped mid-operation.
    ConnectionReset,
    /// Opening a connection timed out or was refused.
    ConnectionTimeout,
    /// The command itself timed out.
    Timeout,
    /// The session was chosen as a deadlock victim.
    Deadlock,
    /// The server is throttling or temporarily overloaded.
    Throttled,
    /// A unique, foreign-key or check constraint was violated.
    ConstraintViolation,
    /// Malformed command text.
    Syntax,
    /// Login or credential failure.
    Authentication,
    /// The principal lacks permission for the operation.
    PermissionDenied,
    /// The operation was cancelled by the caller.
    Cancelled,
    /// Anything else.
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConnectionReset => "connection_reset",
            Self::ConnectionTimeout => "connection_timeout",
            Self::Timeout => "timeout",
            Self::Deadlock => "deadlock",
            Self::Throttled => "throttled",
            Self::ConstraintViolation => "constraint_violation",
            Self::Syntax => "syntax",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Driver-independent view of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription {
    /// Broad category of the failure.
    pub category: ErrorCategory,
    /// Provider-specific error number, if the driver reports one.
    pub code: Option<i64>,
    /// Human-readable message.
    pub message: String,
}

impl ErrorDescription {
    /// Create a description with no provider code.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            code: None,
            message: message.into(),
        }
    }

    /// Attach a provider-specific error number.
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for ErrorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} ({}): {}", self.category, code, self.message),
            None => write!(f, "{}: {}", self.category, self.message),
        }
    }
}

impl std::error::Error for ErrorDescription {}

/// Errors that can describe themselves to a [`Classifier`].
///
/// Driver error types implement this once; every classifier then works
/// against the same abstract description.
pub trait DescribeError {
    /// Produce the abstract description of this error.
    fn describe(&self) -> ErrorDescription;
}

impl DescribeError for ErrorDescription {
    fn describe(&self) -> ErrorDescription {
        self.clone()
    }
}

impl DescribeError for io::Error {
    fn describe(&self) -> ErrorDescription {
        let category = match self.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ErrorCategory::ConnectionReset,
            io::ErrorKind::ConnectionRefused => ErrorCategory::ConnectionTimeout,
            io::ErrorKind::TimedOut => ErrorCategory::Timeout,
            io::ErrorKind::PermissionDenied => ErrorCategory::PermissionDenied,
            _ => ErrorCategory::Other,
        };
        ErrorDescription::new(category, self.to_string())
    }
}

/// Outcome of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Expected to be temporary; the operation may be retried.
    Retryable,
    /// Retrying will not help; propagate immediately.
    Fatal,
}

impl Classification {
    /// Returns `true` for [`Classification::Retryable`].
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable)
    }
}

/// Decides whether a described failure is worth retrying.
pub trait Classifier: Send + Sync {
    /// Classify a failure.
    fn classify(&self, error: &ErrorDescription) -> Classification;
}

/// Plain predicates are classifiers: `true` means retryable.
impl<F> Classifier for F
where
    F: Fn(&ErrorDescription) -> bool + Send + Sync,
{
    fn classify(&self, error: &ErrorDescription) -> Classification {
        if self(error) {
            Classification::Retryable
        } else {
            Classification::Fatal
        }
    }
}

/// The built-in classifier: a set of transient categories and provider codes.
///
/// An error is retryable when its category is in the category set, or when
/// it carries a provider code listed in the code set. [`ErrorCategory::Cancelled`]
/// is never retryable.
///
/// # Examples
///
/// ```rust
/// use dbretry_core::classify::{Classifier, ErrorCategory, ErrorDescription, TransientErrorSet};
///
/// let transient = TransientErrorSet::default()
///     .with_code(1205)
///     .without_category(ErrorCategory::Throttled);
///
/// let deadlock = ErrorDescription::new(ErrorCategory::Other, "victim").with_code(1205);
/// assert!(transient.classify(&deadlock).is_retryable());
///
/// let throttled = ErrorDescription::new(ErrorCategory::Throttled, "slow down");
/// assert!(!transient.classify(&throttled).is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientErrorSet {
    categories: HashSet<ErrorCategory>,
    codes: HashSet<i64>,
}

impl TransientErrorSet {
    /// A set that recognizes nothing; every error is fatal.
    pub fn empty() -> Self {
        Self {
            categories: HashSet::new(),
            codes: HashSet::new(),
        }
    }

    /// Treat a category as transient.
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.categories.insert(category);
        self
    }

    /// Stop treating a category as transient.
    pub fn without_category(mut self, category: ErrorCategory) -> Self {
        self.categories.remove(&category);
        self
    }

    /// Treat a provider error number as transient regardless of category.
    pub fn with_code(mut self, code: i64) -> Self {
        self.codes.insert(code);
        self
    }

    /// Treat every listed provider error number as transient.
    pub fn with_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.codes.extend(codes);
        self
    }

    /// Whether the category is in the transient set.
    pub fn contains_category(&self, category: ErrorCategory) -> bool {
        self.categories.contains(&category)
    }

    /// Whether the provider code is in the transient set.
    pub fn contains_code(&self, code: i64) -> bool {
        self.codes.contains(&code)
    }
}

impl Default for TransientErrorSet {
    /// Connection resets, connection timeouts, command timeouts, deadlocks
    /// and throttling.
    fn default() -> Self {
        Self::empty()
            .with_category(ErrorCategory::ConnectionReset)
            .with_category(ErrorCategory::ConnectionTimeout)
            .with_category(ErrorCategory::Timeout)
            .with_category(ErrorCategory::Deadlock)
            .with_category(ErrorCategory::Throttled)
    }
}

impl Classifier for TransientErrorSet {
    fn classify(&self, error: &ErrorDescription) -> Classification {
        if error.category == ErrorCategory::Cancelled {
            return Classification::Fatal;
        }

        let by_category = self.categories.contains(&error.category);
        let by_code = error.code.is_some_and(|code| self.codes.contains(&code));

        if by_category || by_code {
            Classification::Retryable
        } else {
            Classification::Fatal
        }
    }
}
