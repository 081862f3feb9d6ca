// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use thiserror::Error;

use crate::recovery::{Recovery, RecoveryKind};
use crate::registry::CallSite;

/// The error type produced by primary and fallback operations.
///
/// Operations surface whatever error type they like; the engine boxes it here
/// and preserves it as the `source` of the [`CommandError`] that reaches the
/// caller.
pub type OperationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure surfaced by a command invocation.
///
/// The caller of a command observes either the real result, the fallback
/// result, or one of these failures. When no fallback is configured the
/// innermost failure propagates unchanged through the `source` chain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The primary operation raised an error.
    #[error("primary operation failed")]
    Primary(#[source] OperationError),

    /// The invocation did not complete within the configured deadline.
    ///
    /// The deadline covers the whole wrapped chain, retries included.
    #[error("operation did not complete within {limit:?}")]
    Timeout {
        /// The deadline that was exceeded.
        limit: Duration,
    },

    /// The circuit breaker rejected the invocation before it executed.
    #[error("circuit open, next trial allowed in {retry_after:?}")]
    CircuitOpen {
        /// Time remaining until the breaker allows a trial execution.
        retry_after: Duration,
    },

    /// Every attempt, the original call and all retries, failed.
    #[error("all {attempts} attempts failed")]
    RetryExhausted {
        /// Total number of attempts made (original call plus retries).
        attempts: u32,
        /// The failure of the final attempt.
        source: Box<CommandError>,
    },

    /// The fallback operation itself failed after a primary-path failure.
    ///
    /// Distinct from a primary failure: the caller learns that both paths
    /// were exercised and both failed.
    #[error("fallback operation failed while covering: {covering}")]
    FallbackFailed {
        /// The fallback operation's own error.
        source: OperationError,
        /// The primary-path failure the fallback was covering for.
        covering: Box<CommandError>,
    },
}

impl CommandError {
    /// Returns `true` if this is a deadline failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the circuit breaker rejected the invocation.
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Returns `true` if all attempts were exhausted.
    #[must_use]
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. })
    }

    /// Returns `true` if the fallback operation failed.
    #[must_use]
    pub fn is_fallback_failure(&self) -> bool {
        matches!(self, Self::FallbackFailed { .. })
    }
}

impl Recovery for CommandError {
    fn recovery(&self) -> RecoveryKind {
        match self {
            // A fresh failure of the real operation may be transient.
            Self::Primary(_) => RecoveryKind::Retry,
            // An open circuit means the dependency is gated off.
            Self::CircuitOpen { .. } => RecoveryKind::Unavailable,
            // Deadline hits and exhausted/fallback failures are terminal for
            // this invocation.
            Self::Timeout { .. } | Self::RetryExhausted { .. } | Self::FallbackFailed { .. } => RecoveryKind::Never,
        }
    }
}

/// A configuration failure detected while resolving a command.
///
/// These are construction errors: they surface once, when the call-site is
/// first resolved, never during invocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configured fallback identifier does not name a registered
    /// operation on the command.
    #[error("fallback operation `{0}` is not registered on this command")]
    UnknownFallback(String),

    /// Caching is enabled but no cache key derivation is available.
    #[error("caching is enabled but no cache key derivation is configured")]
    MissingCacheKey,

    /// The breaker failure threshold must allow at least one failure.
    #[error("exceptions_allowed_before_breaking must be at least 1")]
    InvalidBreakerThreshold,

    /// The call-site was previously resolved with different argument or
    /// output types.
    #[error("call-site `{0}` was already resolved with a different command type")]
    CallSiteTypeMismatch(CallSite),
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(CommandError: std::error::Error, Send, Sync);
    assert_impl_all!(ConfigError: std::error::Error, Send, Sync);

    fn primary(message: &str) -> CommandError {
        CommandError::Primary(message.to_string().into())
    }

    #[test]
    fn recovery_classification() {
        assert_eq!(primary("boom").recovery(), RecoveryKind::Retry);
        assert_eq!(
            CommandError::Timeout {
                limit: Duration::from_secs(1)
            }
            .recovery(),
            RecoveryKind::Never
        );
        assert_eq!(
            CommandError::CircuitOpen {
                retry_after: Duration::from_secs(1)
            }
            .recovery(),
            RecoveryKind::Unavailable
        );
        assert_eq!(
            CommandError::RetryExhausted {
                attempts: 4,
                source: Box::new(primary("boom")),
            }
            .recovery(),
            RecoveryKind::Never
        );
        assert_eq!(
            CommandError::FallbackFailed {
                source: "fallback boom".to_string().into(),
                covering: Box::new(primary("boom")),
            }
            .recovery(),
            RecoveryKind::Never
        );
    }

    #[test]
    fn primary_preserves_operation_error_as_source() {
        let err = primary("boom");

        let source = err.source().expect("primary failures carry a source");
        assert_eq!(source.to_string(), "boom");
    }

    #[test]
    fn retry_exhausted_chains_the_last_failure() {
        let err = CommandError::RetryExhausted {
            attempts: 4,
            source: Box::new(primary("final straw")),
        };

        assert_eq!(err.to_string(), "all 4 attempts failed");
        let last = err.source().expect("exhaustion chains the last failure");
        assert_eq!(last.to_string(), "primary operation failed");
        assert_eq!(last.source().expect("inner source").to_string(), "final straw");
    }

    #[test]
    fn fallback_failure_names_both_paths() {
        let err = CommandError::FallbackFailed {
            source: "no backup either".to_string().into(),
            covering: Box::new(CommandError::Timeout {
                limit: Duration::from_millis(250),
            }),
        };

        assert!(err.is_fallback_failure());
        assert!(err.to_string().contains("250ms"));
        let source = err.source().expect("fallback failure carries its own error");
        assert_eq!(source.to_string(), "no backup either");
    }

    #[test]
    fn predicates_match_their_variants() {
        assert!(
            CommandError::Timeout {
                limit: Duration::from_secs(1)
            }
            .is_timeout()
        );
        assert!(
            CommandError::CircuitOpen {
                retry_after: Duration::ZERO
            }
            .is_circuit_open()
        );
        assert!(!primary("boom").is_timeout());
    }
}
