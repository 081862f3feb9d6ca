// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

//! Retry middleware: re-invokes the wrapped chain on transient failures.
//!
//! On a failure classified [`RecoveryKind::Retry`][crate::RecoveryKind::Retry],
//! the middleware waits the configured interval and re-invokes the inner
//! service, up to `max_retry_times` additional attempts (total attempts =
//! `max_retry_times + 1`). Any attempt's success short-circuits the remaining
//! retries. Exhausting all attempts surfaces
//! [`CommandError::RetryExhausted`][crate::CommandError::RetryExhausted] with
//! the final failure as its source.
//!
//! The delay between attempts is constant by default; exponential backoff and
//! jitter are opt-in through [`CommandOptions`][crate::CommandOptions].
//!
//! Failures classified `Never` or `Unavailable` (deadline hits, an open
//! circuit) are not retried here: they pass through immediately and consume no
//! further attempts.

mod backoff;
mod layer;
mod service;

pub(crate) use backoff::RetryDelays;
pub use layer::RetryLayer;
pub use service::Retry;
