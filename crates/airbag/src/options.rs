// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A flag indicating that a required builder property is set.
#[non_exhaustive]
#[derive(Debug)]
pub struct Set;

/// A flag indicating that a required builder property has not been set.
#[non_exhaustive]
#[derive(Debug)]
pub struct NotSet;

/// Default delay between retry attempts.
pub(crate) const DEFAULT_RETRY_INTERVAL_MS: u64 = 100;

/// Default number of consecutive failures tolerated before the circuit opens.
pub(crate) const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default duration the circuit stays open before allowing a trial execution.
pub(crate) const DEFAULT_BREAK_MS: u64 = 1000;

/// Default capacity of a command's result cache.
pub(crate) const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Declarative per-call-site resilience configuration.
///
/// One instance of this type configures one decorated operation. It is
/// resolved once, validated once, and never mutated afterwards; every
/// invocation of the call-site reads the same options.
///
/// The struct deserializes with serde so an outer configuration or attribute
/// layer can produce it from plain data. Every field has a default, so a
/// partial document configures only what it names:
///
/// ```
/// use airbag::CommandOptions;
///
/// let options: CommandOptions =
///     serde_json::from_str(r#"{ "max_retry_times": 3, "timeout_ms": 500 }"#)?;
///
/// assert_eq!(options.max_retry_times, 3);
/// assert_eq!(options.timeout_ms, 500);
/// assert_eq!(options.retry_interval_ms, 100);
/// # Ok::<(), serde_json::Error>(())
/// ```
///
/// # Defaults
///
/// | Field | Default | Meaning of default |
/// |-------|---------|--------------------|
/// | `fallback_operation` | `None` | failures propagate to the caller |
/// | `max_retry_times` | `0` | no retries |
/// | `retry_interval_ms` | `100` | delay between attempts when retrying |
/// | `retry_backoff` | `Constant` | same delay before every retry |
/// | `retry_jitter` | `false` | exact delays |
/// | `enable_circuit_breaker` | `false` | no circuit breaking |
/// | `exceptions_allowed_before_breaking` | `3` | failures before the circuit opens |
/// | `ms_of_break` | `1000` | how long the circuit stays open |
/// | `timeout_ms` | `0` | no deadline |
/// | `cache_ms` | `0` | no result caching |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    /// Identifier of the fallback operation registered on the command.
    ///
    /// Resolution is validated when the command is built, not per call.
    pub fallback_operation: Option<String>,

    /// Maximum number of retries in addition to the original call.
    pub max_retry_times: u32,

    /// Delay between attempts, in milliseconds.
    pub retry_interval_ms: u64,

    /// How the delay evolves across attempts. Constant by default.
    pub retry_backoff: Backoff,

    /// Randomizes each delay within ±25% to decorrelate concurrent retriers.
    pub retry_jitter: bool,

    /// Enables the circuit breaker layer.
    pub enable_circuit_breaker: bool,

    /// Consecutive failures tolerated before the circuit opens. Must be at
    /// least 1.
    pub exceptions_allowed_before_breaking: u32,

    /// How long the circuit stays open before one trial execution is allowed,
    /// in milliseconds.
    pub ms_of_break: u64,

    /// Deadline for a whole invocation (retries included), in milliseconds.
    /// 0 disables the deadline.
    pub timeout_ms: u64,

    /// Time-to-live for cached results, in milliseconds. 0 disables caching.
    pub cache_ms: u64,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            fallback_operation: None,
            max_retry_times: 0,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            retry_backoff: Backoff::Constant,
            retry_jitter: false,
            enable_circuit_breaker: false,
            exceptions_allowed_before_breaking: DEFAULT_FAILURE_THRESHOLD,
            ms_of_break: DEFAULT_BREAK_MS,
            timeout_ms: 0,
            cache_ms: 0,
        }
    }
}

impl CommandOptions {
    /// Checks the options for values the engine cannot honor.
    ///
    /// Runs once when a command is built; invocation never re-validates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exceptions_allowed_before_breaking == 0 {
            return Err(ConfigError::InvalidBreakerThreshold);
        }
        Ok(())
    }

    /// Returns `true` if the retry layer participates in the pipeline.
    #[must_use]
    pub fn retry_enabled(&self) -> bool {
        self.max_retry_times > 0
    }

    /// Returns `true` if the timeout layer participates in the pipeline.
    #[must_use]
    pub fn timeout_enabled(&self) -> bool {
        self.timeout_ms > 0
    }

    /// Returns `true` if results are cached.
    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache_ms > 0
    }

    pub(crate) fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn break_duration(&self) -> Duration {
        Duration::from_millis(self.ms_of_break)
    }

    pub(crate) fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }
}

/// Strategy for evolving the retry delay across attempts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// The same delay before every retry.
    #[default]
    Constant,

    /// The delay doubles with every retry (`interval × 2^attempt`).
    Exponential,
}
