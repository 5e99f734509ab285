//! Retry configuration.
//!
//! [`RetryConfig`] is the serializable form of a [`RetryPolicy`]: it can be
//! embedded in an application's config file or read from `DBRETRY_*`
//! environment variables. Custom retry predicates and listeners cannot be
//! expressed in config; register them on the builder returned by
//! [`RetryConfig::policy_builder`].

use crate::classify::TransientErrorSet;
use crate::error::{ConfigError, ConfigResult};
use crate::retry::{Backoff, BackoffKind, ExhaustionMode, RetryPolicy, RetryPolicyBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serializable retry configuration.
///
/// # Examples
///
/// ```rust
/// use dbretry_core::config::RetryConfig;
///
/// let config = RetryConfig {
///     max_retries: 3,
///     base_delay_ms: 50,
///     ..Default::default()
/// };
/// let policy = config.to_policy().unwrap();
/// assert_eq!(policy.max_retries(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts allowed after the initial one.
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Backoff strategy.
    pub backoff: BackoffKind,

    /// Growth factor for exponential backoff.
    pub multiplier: f64,

    /// Whether delays are randomized.
    pub jitter: bool,

    /// Randomization factor (0.0 to 1.0) used when `jitter` is on.
    pub jitter_factor: f64,

    /// What to report once the attempt budget is spent.
    pub exhaustion: ExhaustionMode,

    /// Provider error numbers treated as transient in addition to the
    /// default transient categories.
    pub transient_codes: Vec<i64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff: BackoffKind::Exponential,
            multiplier: 2.0,
            jitter: true,
            jitter_factor: crate::retry::DEFAULT_JITTER,
            exhaustion: ExhaustionMode::LastError,
            transient_codes: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `DBRETRY_MAX_RETRIES` for the retry budget
    /// - `DBRETRY_BASE_DELAY_MS` for the first retry delay
    /// - `DBRETRY_MAX_DELAY_MS` for the delay cap
    /// - `DBRETRY_BACKOFF` for the strategy (`fixed` or `exponential`)
    /// - `DBRETRY_MULTIPLIER` for the exponential growth factor
    /// - `DBRETRY_JITTER` for the jitter toggle (`true`/`false`)
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] when a variable is set to a value
    /// that cannot be parsed.
    #[cfg(feature = "env")]
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(value) = env_parse("DBRETRY_MAX_RETRIES")? {
            config.max_retries = value;
        }
        if let Some(value) = env_parse("DBRETRY_BASE_DELAY_MS")? {
            config.base_delay_ms = value;
        }
        if let Some(value) = env_parse("DBRETRY_MAX_DELAY_MS")? {
            config.max_delay_ms = value;
        }
        if let Some(value) = env_parse("DBRETRY_MULTIPLIER")? {
            config.multiplier = value;
        }
        if let Some(value) = env_parse("DBRETRY_JITTER")? {
            config.jitter = value;
        }
        if let Ok(raw) = std::env::var("DBRETRY_BACKOFF") {
            config.backoff = match raw.trim().to_ascii_lowercase().as_str() {
                "fixed" => BackoffKind::Fixed,
                "exponential" => BackoffKind::Exponential,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        variable: "DBRETRY_BACKOFF",
                        value: raw,
                    });
                }
            };
        }

        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the multiplier is below 1.0 or
    /// not finite, the jitter factor is outside `[0.0, 1.0]`, or the base
    /// delay exceeds the cap.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::Invalid(format!(
                "jitter_factor must be within [0.0, 1.0], got {}",
                self.jitter_factor
            )));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Merge this configuration with another, with the other taking
    /// precedence wherever it differs from the defaults.
    pub fn merge(mut self, other: RetryConfig) -> Self {
        let defaults = Self::default();
        if other.max_retries != defaults.max_retries {
            self.max_retries = other.max_retries;
        }
        if other.base_delay_ms != defaults.base_delay_ms {
            self.base_delay_ms = other.base_delay_ms;
        }
        if other.max_delay_ms != defaults.max_delay_ms {
            self.max_delay_ms = other.max_delay_ms;
        }
        if other.backoff != defaults.backoff {
            self.backoff = other.backoff;
        }
        if other.multiplier != defaults.multiplier {
            self.multiplier = other.multiplier;
        }
        if other.jitter != defaults.jitter {
            self.jitter = other.jitter;
        }
        if other.jitter_factor != defaults.jitter_factor {
            self.jitter_factor = other.jitter_factor;
        }
        if other.exhaustion != defaults.exhaustion {
            self.exhaustion = other.exhaustion;
        }
        if !other.transient_codes.is_empty() {
            self.transient_codes = other.transient_codes;
        }
        self
    }

    /// Validate and turn the config into a builder, ready for a custom
    /// predicate or listener.
    pub fn policy_builder(&self) -> ConfigResult<RetryPolicyBuilder> {
        self.validate()?;

        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                multiplier: self.multiplier,
            },
        };
        let jitter = if self.jitter { self.jitter_factor } else { 0.0 };

        Ok(RetryPolicy::builder()
            .max_retries(self.max_retries)
            .base_delay(Duration::from_millis(self.base_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .backoff(backoff)
            .jitter_factor(jitter)
            .exhaustion(self.exhaustion)
            .transient_errors(
                TransientErrorSet::default().with_codes(self.transient_codes.iter().copied()),
            ))
    }

    /// Validate and build a policy.
    pub fn to_policy(&self) -> ConfigResult<RetryPolicy> {
        Ok(self.policy_builder()?.build())
    }
}

impl RetryPolicy {
    /// Build a policy from a validated config.
    pub fn from_config(config: &RetryConfig) -> ConfigResult<Self> {
        config.to_policy()
    }
}

#[cfg(feature = "env")]
fn env_parse<T: std::str::FromStr>(variable: &'static str) -> ConfigResult<Option<T>> {
    match std::env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                variable,
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ErrorCategory, ErrorDescription};

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 1_000);
        assert_eq!(config.max_delay_ms, 30_000);
        assert_eq!(config.backoff, BackoffKind::Exponential);
        assert!(config.jitter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: RetryConfig = toml::from_str(
            r#"
            max_retries = 2
            backoff = "fixed"
            jitter = false
            exhaustion = "aggregate"
            transient_codes = [1205, 40613]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 2);
        assert_eq!(config.backoff, BackoffKind::Fixed);
        assert!(!config.jitter);
        assert_eq!(config.exhaustion, ExhaustionMode::Aggregate);
        assert_eq!(config.transient_codes, vec![1205, 40613]);
        // Unspecified fields keep defaults
        assert_eq!(config.base_delay_ms, 1_000);
    }

    #[test]
    fn test_to_policy() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            backoff: BackoffKind::Fixed,
            jitter: false,
            transient_codes: vec![4060],
            ..Default::default()
        };
        let policy = config.to_policy().unwrap();

        assert_eq!(policy.max_retries(), 2);
        assert_eq!(policy.schedule().backoff(), Backoff::Fixed);
        assert_eq!(policy.schedule().jitter(), 0.0);
        assert_eq!(policy.retry_delay(3), Duration::from_millis(100));

        let by_code = ErrorDescription::new(ErrorCategory::Other, "cannot open db").with_code(4060);
        assert!(policy.classify(&by_code).is_retryable());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let shrinking = RetryConfig {
            multiplier: 0.5,
            ..Default::default()
        };
        assert!(matches!(shrinking.validate(), Err(ConfigError::Invalid(_))));

        let inverted = RetryConfig {
            base_delay_ms: 10_000,
            max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(inverted.to_policy().is_err());

        let wild_jitter = RetryConfig {
            jitter_factor: 1.5,
            ..Default::default()
        };
        assert!(wild_jitter.validate().is_err());
    }

    #[test]
    fn test_config_merge() {
        let base = RetryConfig {
            max_retries: 8,
            ..Default::default()
        };
        let overrides = RetryConfig {
            base_delay_ms: 250,
            ..Default::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.max_retries, 8);
        assert_eq!(merged.base_delay_ms, 250);
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("DBRETRY_MAX_RETRIES", Some("7")),
                ("DBRETRY_BASE_DELAY_MS", Some("20")),
                ("DBRETRY_BACKOFF", Some("Fixed")),
                ("DBRETRY_JITTER", Some("false")),
                ("DBRETRY_MAX_DELAY_MS", None),
                ("DBRETRY_MULTIPLIER", None),
            ],
            || {
                let config = RetryConfig::from_env().unwrap();
                assert_eq!(config.max_retries, 7);
                assert_eq!(config.base_delay_ms, 20);
                assert_eq!(config.backoff, BackoffKind::Fixed);
                assert!(!config.jitter);
                assert_eq!(config.max_delay_ms, 30_000);
            },
        );
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_from_env_invalid_value() {
        temp_env::with_vars(
            [
                ("DBRETRY_MAX_RETRIES", Some("lots")),
                ("DBRETRY_BACKOFF", None::<&str>),
            ],
            || {
                let err = RetryConfig::from_env().unwrap_err();
                assert_eq!(
                    err,
                    ConfigError::InvalidEnv {
                        variable: "DBRETRY_MAX_RETRIES",
                        value: "lots".to_string(),
                    }
                );
            },
        );
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_from_env_invalid_backoff() {
        temp_env::with_vars(
            [
                ("DBRETRY_MAX_RETRIES", None::<&str>),
                ("DBRETRY_BACKOFF", Some("linear")),
            ],
            || {
                assert!(RetryConfig::from_env().is_err());
            },
        );
    }
}
