//! Terminal errors of the retry engine.
//!
//! A retried operation ends in exactly one of three ways besides success:
//! a fatal error on some attempt, exhaustion of the attempt budget, or
//! cancellation. [`RetryError`] keeps the three apart so callers can handle
//! them differently.

use crate::classify::{DescribeError, ErrorCategory, ErrorDescription};
use thiserror::Error;

/// Terminal failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The classifier rejected the error; no retry was attempted for it.
    #[error("fatal error: {0}")]
    Fatal(#[source] E),

    /// Every permitted attempt failed with a transient error.
    #[error("retry limit exceeded after {attempts} attempts: {source}")]
    Exhausted {
        /// Total attempts made, including the initial one.
        attempts: u32,
        /// The error of the last attempt.
        #[source]
        source: E,
        /// Errors of earlier attempts, oldest first. Empty unless the policy
        /// uses [`ExhaustionMode::Aggregate`](crate::retry::ExhaustionMode::Aggregate).
        previous: Vec<E>,
    },

    /// A cancellation request was observed.
    #[error("operation cancelled after {attempts} attempts")]
    Cancelled {
        /// Attempts started before cancellation was observed.
        attempts: u32,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Returns `true` for [`RetryError::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Returns `true` for [`RetryError::Exhausted`].
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns `true` for [`RetryError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Number of attempts made, when known.
    ///
    /// A fatal error does not record its attempt number.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Fatal(_) => None,
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts } => Some(*attempts),
        }
    }

    /// The underlying operation error, if there is one.
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::Fatal(err) | Self::Exhausted { source: err, .. } => Some(err),
            Self::Cancelled { .. } => None,
        }
    }

    /// Consume the error and return the underlying operation error.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Fatal(err) | Self::Exhausted { source: err, .. } => Some(err),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Retry errors describe themselves through the operation error they carry,
/// so a retried call can itself be nested inside another policy. A
/// cancellation always describes as [`ErrorCategory::Cancelled`].
impl<E> DescribeError for RetryError<E>
where
    E: DescribeError + std::error::Error + 'static,
{
    fn describe(&self) -> ErrorDescription {
        match self {
            Self::Fatal(err) | Self::Exhausted { source: err, .. } => err.describe(),
            Self::Cancelled { .. } => {
                ErrorDescription::new(ErrorCategory::Cancelled, self.to_string())
            }
        }
    }
}

/// Invalid retry configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {variable}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        variable: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },

    /// A configuration value is out of range.
    #[error("invalid retry configuration: {0}")]
    Invalid(String),
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
