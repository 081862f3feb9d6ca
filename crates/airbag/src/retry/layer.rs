// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use crate::options::{Backoff, CommandOptions};
use crate::retry::RetryDelays;
use crate::retry::service::Retry;
use crate::service::Layer;

/// Configures the retry middleware.
///
/// The pipeline assembler creates this layer from a call-site's
/// [`CommandOptions`][crate::CommandOptions]; it can also be constructed
/// directly when composing services by hand.
#[derive(Debug, Clone)]
pub struct RetryLayer {
    max_retries: u32,
    backoff: Backoff,
    interval: Duration,
    jitter: bool,
}

impl RetryLayer {
    /// Creates a retry layer with `max_retries` additional attempts and a
    /// constant `interval` between attempts.
    #[must_use]
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Constant,
            interval,
            jitter: false,
        }
    }

    /// Sets the backoff strategy. Constant by default.
    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Enables or disables delay jitter. Disabled by default.
    #[must_use]
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub(crate) fn from_options(options: &CommandOptions) -> Self {
        Self {
            max_retries: options.max_retry_times,
            backoff: options.retry_backoff,
            interval: options.retry_interval(),
            jitter: options.retry_jitter,
        }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Retry {
            max_retries: self.max_retries,
            delays: RetryDelays::new(self.backoff, self.interval, self.jitter),
            inner,
        }
    }
}
