//! Retry policy engine and backoff schedules.
//!
//! This module provides the engine that runs a database operation with
//! bounded retries, classifying each failure and waiting between attempts
//! according to a backoff schedule.
//!
//! # Key Types
//!
//! - [`ExecutionStrategy`] - Core trait: blocking `execute` and cancellable `execute_async`
//! - [`RetryPolicy`] - The configurable strategy implementation
//! - [`BackoffSchedule`] - Fixed or exponential delays with jitter and a cap
//! - [`RetryListener`] - Observer notified before every retry
//!
//! # Examples
//!
//! ```rust
//! use dbretry_core::classify::{ErrorCategory, ErrorDescription};
//! use dbretry_core::retry::{ExecutionStrategy, RetryPolicy};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .base_delay(Duration::from_millis(100))
//!     .build();
//!
//! let token = CancellationToken::new();
//! let affected = policy
//!     .execute_async(
//!         |_token| async {
//!             // Your database call here
//!             Ok::<_, ErrorDescription>(1)
//!         },
//!         &token,
//!     )
//!     .await?;
//! # let _ = (affected, ErrorCategory::Other);
//! # Ok(())
//! # }
//! ```

mod attempt;
mod backoff;
mod policy;

pub use attempt::{Attempt, AttemptOutcome, RetryEvent, RetryListener};
pub use backoff::{Backoff, BackoffKind, BackoffSchedule};
pub use policy::{
    DEFAULT_JITTER, ExecutionStrategy, ExhaustionMode, RetryPolicy, RetryPolicyBuilder,
};
