//! Backoff schedules between attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed,
    /// Delay multiplied by `multiplier` after every retry.
    Exponential {
        /// Growth factor between consecutive retries.
        multiplier: f64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential { multiplier: 2.0 }
    }
}

/// Serialized name of a [`Backoff`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// [`Backoff::Fixed`]
    Fixed,
    /// [`Backoff::Exponential`]
    #[default]
    Exponential,
}

/// A complete delay schedule: strategy, base delay, cap and jitter.
///
/// Delays are computed for the 1-indexed attempt that is *about* to run.
/// Attempt 1 is the initial try and never waits.
///
/// # Mathematical Formula
///
/// For attempt `i >= 2`:
/// ```text
/// fixed:       raw = base
/// exponential: raw = base * multiplier ^ (i - 2)
/// capped       = min(raw, max_delay)
/// jittered     = capped + capped * jitter * random(-1.0, +1.0)
/// final        = clamp(jittered, 0, max_delay)
/// ```
///
/// # Examples
///
/// ```rust
/// use dbretry_core::retry::{Backoff, BackoffSchedule};
/// use std::time::Duration;
///
/// let schedule = BackoffSchedule::new(
///     Backoff::Exponential { multiplier: 2.0 },
///     Duration::from_millis(100),
///     Duration::from_secs(10),
///     0.0,
/// );
///
/// assert_eq!(schedule.delay_for_attempt(1), Duration::ZERO);
/// assert_eq!(schedule.delay_for_attempt(2), Duration::from_millis(100));
/// assert_eq!(schedule.delay_for_attempt(3), Duration::from_millis(200));
/// assert_eq!(schedule.delay_for_attempt(4), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffSchedule {
    backoff: Backoff,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl BackoffSchedule {
    /// Create a schedule. `jitter` is clamped to `[0.0, 1.0]`; a multiplier
    /// below 1.0 is raised to 1.0 so delays never shrink.
    pub fn new(backoff: Backoff, base_delay: Duration, max_delay: Duration, jitter: f64) -> Self {
        let backoff = match backoff {
            Backoff::Exponential { multiplier } if !(multiplier >= 1.0) => {
                Backoff::Exponential { multiplier: 1.0 }
            }
            other => other,
        };
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            backoff,
            base_delay,
            max_delay,
            jitter,
        }
    }

    /// Delay to wait before running attempt `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let capped = self.raw_delay(attempt - 2).min(self.max_delay);
        if self.jitter == 0.0 || capped.is_zero() {
            return capped;
        }

        let capped_secs = capped.as_secs_f64();
        let offset = capped_secs * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
        let jittered = (capped_secs + offset).clamp(0.0, self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(jittered).map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    fn raw_delay(&self, retry_index: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential { multiplier } => {
                let exponent = i32::try_from(retry_index).unwrap_or(i32::MAX);
                let secs = self.base_delay.as_secs_f64() * multiplier.powi(exponent);
                // Overflowing growth saturates at the cap.
                Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
            }
        }
    }

    /// The strategy in use.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound on any single delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Jitter factor in `[0.0, 1.0]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(
            Backoff::default(),
            Duration::from_secs(1),
            Duration::from_secs(30),
            0.1,
        )
    }
}
