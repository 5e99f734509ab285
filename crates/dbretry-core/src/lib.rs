#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry policy engine for database operations.
//!
//! This crate decides whether a failed database operation is retried, how
//! many times, with what backoff, and which failures are safe to retry:
//!
//! - **Pluggable classification** via [`classify::Classifier`] over a
//!   driver-independent [`classify::ErrorDescription`]
//!   - Built-in [`classify::TransientErrorSet`] (categories + provider codes)
//!   - Plain predicates (`Fn(&ErrorDescription) -> bool`)
//!   - Unrecognized failures are fatal
//! - **Backoff schedules** via [`retry::BackoffSchedule`]
//!   - Fixed or exponential, capped, with optional jitter
//! - **Blocking and async execution** via [`retry::ExecutionStrategy`]
//!   - The async path is cancellable at every suspension point
//! - **Distinct terminal errors** via [`error::RetryError`]
//!   - Fatal, retry-exhausted, cancelled
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use dbretry_core::prelude::*;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .base_delay(Duration::from_millis(1))
//!     .build();
//!
//! let result = policy.execute(|| {
//!     Err::<(), _>(ErrorDescription::new(ErrorCategory::Syntax, "near 'SELEC'"))
//! });
//!
//! assert!(result.unwrap_err().is_fatal());
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// Import all core abstractions with:
///
/// ```rust
/// use dbretry_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::classify::{
        Classification, Classifier, DescribeError, ErrorCategory, ErrorDescription,
        TransientErrorSet,
    };
    pub use crate::config::RetryConfig;
    pub use crate::error::RetryError;
    pub use crate::retry::{
        Backoff, ExecutionStrategy, ExhaustionMode, RetryEvent, RetryListener, RetryPolicy,
        RetryPolicyBuilder,
    };
    pub use tokio_util::sync::CancellationToken;
}
