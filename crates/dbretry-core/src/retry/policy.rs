//! The retry policy engine.

use super::attempt::{Attempt, AttemptOutcome, RetryEvent, RetryListener};
use super::backoff::{Backoff, BackoffSchedule};
use crate::classify::{
    Classification, Classifier, DescribeError, ErrorCategory, ErrorDescription, TransientErrorSet,
};
use crate::error::RetryError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Executes operations with bounded retry semantics.
///
/// Implementations decide whether a failure is retried, how long to wait
/// between attempts, and when to give up. Every call is independent: no
/// attempt counter or error history is shared between calls, so one
/// strategy value can serve many concurrent callers.
///
/// # Examples
///
/// ```rust
/// use dbretry_core::classify::{ErrorCategory, ErrorDescription};
/// use dbretry_core::retry::{ExecutionStrategy, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(3)
///     .base_delay(Duration::from_millis(1))
///     .build();
///
/// let mut calls = 0;
/// let rows = policy.execute(|| {
///     calls += 1;
///     if calls < 3 {
///         Err(ErrorDescription::new(ErrorCategory::Deadlock, "victim"))
///     } else {
///         Ok(7)
///     }
/// });
///
/// assert_eq!(rows.unwrap(), 7);
/// assert_eq!(calls, 3);
/// ```
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Run a blocking operation, sleeping the calling thread between attempts.
    ///
    /// # Returns
    /// - `Ok(T)`: the first successful result
    /// - `Err(RetryError::Fatal)`: the classifier rejected an error
    /// - `Err(RetryError::Exhausted)`: every permitted attempt failed transiently
    /// - `Err(RetryError::Cancelled)`: the operation reported a cancellation
    fn execute<T, E, F>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: DescribeError + std::error::Error + 'static;

    /// Run an async operation, suspending between attempts.
    ///
    /// The token is checked before every attempt, raced against the
    /// in-flight attempt and raced against the backoff wait. Observing a
    /// cancellation ends the call with [`RetryError::Cancelled`] and no
    /// further attempt is made. Each attempt receives a clone of the token
    /// so the underlying call can cooperate with cancellation itself.
    async fn execute_async<T, E, F, Fut>(
        &self,
        operation: F,
        token: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(CancellationToken) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: DescribeError + std::error::Error + Send + Sync + 'static;
}

/// What to report once the attempt budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionMode {
    /// Report only the last transient error.
    #[default]
    LastError,
    /// Report the last error and keep every earlier one.
    Aggregate,
}

/// Retry policy for database operations.
///
/// Immutable configuration: attempt budget, backoff schedule, classifier,
/// exhaustion mode and an optional retry listener. Cloning is cheap and
/// clones share the classifier and listener.
///
/// `max_retries` counts attempts *after* the first: a policy with
/// `max_retries = 3` runs an operation at most 4 times.
///
/// # Default Configuration
///
/// - `max_retries`: 5
/// - `base_delay`: 1s
/// - `max_delay`: 30s
/// - `backoff`: exponential, multiplier 2.0
/// - `jitter`: 0.1 (10% randomization)
/// - classifier: [`TransientErrorSet::default()`]
/// - exhaustion: [`ExhaustionMode::LastError`]
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    schedule: BackoffSchedule,
    classifier: Arc<dyn Classifier>,
    exhaustion: ExhaustionMode,
    listener: Option<Arc<dyn RetryListener>>,
}

impl RetryPolicy {
    /// Create a new builder.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that runs every operation exactly once.
    pub fn none() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// Maximum number of attempts after the initial one.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The backoff schedule.
    pub fn schedule(&self) -> &BackoffSchedule {
        &self.schedule
    }

    /// Exhaustion reporting mode.
    pub fn exhaustion(&self) -> ExhaustionMode {
        self.exhaustion
    }

    /// Delay before attempt `attempt` (1-indexed). Zero for the first attempt.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.schedule.delay_for_attempt(attempt)
    }

    /// Classify a described failure with this policy's classifier.
    pub fn classify(&self, error: &ErrorDescription) -> Classification {
        self.classifier.classify(error)
    }

    fn record(&self, number: u32, outcome: AttemptOutcome, elapsed: Duration) {
        if let Some(listener) = &self.listener {
            listener.on_attempt(&Attempt {
                number,
                outcome,
                elapsed,
            });
        }
    }

    /// Decide what follows an attempt: return, or wait and go again.
    fn settle<T, E>(
        &self,
        attempt: u32,
        elapsed: Duration,
        result: Result<T, E>,
        previous: &mut Vec<E>,
    ) -> Step<T, E>
    where
        E: DescribeError + std::error::Error + 'static,
    {
        let err = match result {
            Ok(value) => {
                if attempt > 1 {
                    trace!(attempts = attempt, "Retry succeeded");
                }
                self.record(attempt, AttemptOutcome::Succeeded, elapsed);
                return Step::Done(Ok(value));
            }
            Err(err) => err,
        };

        let description = err.describe();
        if description.category == ErrorCategory::Cancelled {
            debug!(attempts = attempt, error = %description, "Operation reported cancellation");
            return Step::Done(Err(RetryError::Cancelled { attempts: attempt }));
        }

        if !self.classifier.classify(&description).is_retryable() {
            debug!(attempt, error = %description, "Non-retryable error");
            self.record(attempt, AttemptOutcome::Fatal, elapsed);
            return Step::Done(Err(RetryError::Fatal(err)));
        }

        self.record(attempt, AttemptOutcome::Retryable, elapsed);

        if attempt > self.max_retries {
            warn!(
                attempts = attempt,
                error = %description,
                "Retry limit exceeded"
            );
            return Step::Done(Err(RetryError::Exhausted {
                attempts: attempt,
                source: err,
                previous: std::mem::take(previous),
            }));
        }

        let delay = self.schedule.delay_for_attempt(attempt.saturating_add(1));
        debug!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %description,
            "Transient error, retrying"
        );

        if let Some(listener) = &self.listener {
            listener.on_retry(&RetryEvent {
                attempt: Attempt {
                    number: attempt,
                    outcome: AttemptOutcome::Retryable,
                    elapsed,
                },
                delay,
                error: err.to_string(),
            });
        }

        if self.exhaustion == ExhaustionMode::Aggregate {
            previous.push(err);
        }

        Step::Retry(delay)
    }
}

enum Step<T, E>
where
    E: std::error::Error + 'static,
{
    Done(Result<T, RetryError<E>>),
    Retry(Duration),
}

#[async_trait]
impl ExecutionStrategy for RetryPolicy {
    fn execute<T, E, F>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: DescribeError + std::error::Error + 'static,
    {
        let mut previous = Vec::new();
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let started = Instant::now();
            let result = operation();

            match self.settle(attempt, started.elapsed(), result, &mut previous) {
                Step::Done(outcome) => return outcome,
                Step::Retry(delay) => std::thread::sleep(delay),
            }
        }
    }

    async fn execute_async<T, E, F, Fut>(
        &self,
        mut operation: F,
        token: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(CancellationToken) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: DescribeError + std::error::Error + Send + Sync + 'static,
    {
        let mut previous = Vec::new();
        let mut attempt: u32 = 0;
        loop {
            if token.is_cancelled() {
                debug!(attempts = attempt, "Operation cancelled before attempt");
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            attempt = attempt.saturating_add(1);
            let started = tokio::time::Instant::now();
            let result = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(attempts = attempt, "Operation cancelled during execution");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                result = operation(token.clone()) => result,
            };

            match self.settle(attempt, started.elapsed(), result, &mut previous) {
                Step::Done(outcome) => return outcome,
                Step::Retry(delay) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            debug!(attempts = attempt, "Operation cancelled during backoff");
                            return Err(RetryError::Cancelled { attempts: attempt });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("schedule", &self.schedule)
            .field("exhaustion", &self.exhaustion)
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryPolicy`].
///
/// # Examples
///
/// ```rust
/// use dbretry_core::classify::{ErrorCategory, ErrorDescription};
/// use dbretry_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(4)
///     .base_delay(Duration::from_millis(200))
///     .max_delay(Duration::from_secs(5))
///     .multiplier(1.5)
///     .jitter(true)
///     .retry_if(|e: &ErrorDescription| {
///         e.category == ErrorCategory::Deadlock || e.code == Some(40613)
///     })
///     .build();
///
/// assert_eq!(policy.max_retries(), 4);
/// ```
pub struct RetryPolicyBuilder {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff: Backoff,
    jitter: f64,
    classifier: Arc<dyn Classifier>,
    exhaustion: ExhaustionMode,
    listener: Option<Arc<dyn RetryListener>>,
}

/// Jitter factor applied when jitter is switched on without an explicit factor.
pub const DEFAULT_JITTER: f64 = 0.1;

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::default(),
            jitter: DEFAULT_JITTER,
            classifier: Arc::new(TransientErrorSet::default()),
            exhaustion: ExhaustionMode::default(),
            listener: None,
        }
    }
}

impl RetryPolicyBuilder {
    /// Set the maximum number of attempts after the initial one.
    ///
    /// Default: 5
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    ///
    /// Default: 1s
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the upper bound on any single delay.
    ///
    /// Default: 30s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff strategy.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Use a constant delay between attempts.
    pub fn fixed(self) -> Self {
        self.backoff(Backoff::Fixed)
    }

    /// Use exponential backoff with the given growth factor.
    ///
    /// Default: exponential, 2.0
    pub fn multiplier(self, multiplier: f64) -> Self {
        self.backoff(Backoff::Exponential { multiplier })
    }

    /// Switch jitter on (10% randomization) or off.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = if enabled { DEFAULT_JITTER } else { 0.0 };
        self
    }

    /// Set the jitter factor (0.0 to 1.0). A factor of 0.1 lets each delay
    /// vary by ±10%.
    pub fn jitter_factor(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replace the classifier.
    pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Retry exactly the errors for which `predicate` returns `true`.
    pub fn retry_if<P>(self, predicate: P) -> Self
    where
        P: Fn(&ErrorDescription) -> bool + Send + Sync + 'static,
    {
        self.classifier(predicate)
    }

    /// Use a transient-error set as the classifier.
    pub fn transient_errors(self, set: TransientErrorSet) -> Self {
        self.classifier(set)
    }

    /// Choose what to report once the attempt budget is spent.
    pub fn exhaustion(mut self, mode: ExhaustionMode) -> Self {
        self.exhaustion = mode;
        self
    }

    /// Register a listener notified before every retry.
    pub fn on_retry(mut self, listener: impl RetryListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Build the policy.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            schedule: BackoffSchedule::new(
                self.backoff,
                self.base_delay,
                self.max_delay,
                self.jitter,
            ),
            classifier: self.classifier,
            exhaustion: self.exhaustion,
            listener: self.listener,
        }
    }
}
