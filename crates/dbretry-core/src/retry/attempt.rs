//! Attempt records and retry notifications.

use std::time::Duration;

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The operation produced a value.
    Succeeded,
    /// The operation failed with an error classified as transient.
    Retryable,
    /// The operation failed with an error classified as fatal.
    Fatal,
}

/// One execution try of a logical operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// 1-indexed attempt number; attempt 1 is the initial try.
    pub number: u32,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
    /// Wall time spent inside the operation for this attempt.
    pub elapsed: Duration,
}

/// Emitted after a transient failure, before waiting for the next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// The attempt that just failed.
    pub attempt: Attempt,
    /// Delay chosen before the next attempt.
    pub delay: Duration,
    /// Rendered error of the failed attempt.
    pub error: String,
}

impl RetryEvent {
    /// Number of the attempt that will run after the delay.
    pub fn next_attempt(&self) -> u32 {
        self.attempt.number + 1
    }
}

/// Observer of transient failures.
///
/// Listeners are advisory: they see each retry but cannot change whether or
/// when it happens.
///
/// # Examples
///
/// ```rust
/// use dbretry_core::retry::{RetryEvent, RetryPolicy};
///
/// let policy = RetryPolicy::builder()
///     .on_retry(|event: &RetryEvent| {
///         eprintln!("attempt {} failed, waiting {:?}", event.attempt.number, event.delay);
///     })
///     .build();
/// # let _ = policy;
/// ```
pub trait RetryListener: Send + Sync {
    /// Called once per transient failure that will be retried.
    fn on_retry(&self, event: &RetryEvent);

    /// Called once per completed attempt, after it has been classified.
    ///
    /// An attempt interrupted by cancellation, or failing with an error
    /// described as cancelled, is not recorded.
    fn on_attempt(&self, attempt: &Attempt) {
        let _ = attempt;
    }
}

impl<F> RetryListener for F
where
    F: Fn(&RetryEvent) + Send + Sync,
{
    fn on_retry(&self, event: &RetryEvent) {
        self(event)
    }
}
