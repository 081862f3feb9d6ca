// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use crate::service::Layer;
use crate::timeout::service::Timeout;

/// Configures the timeout middleware.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    limit: Duration,
}

impl TimeoutLayer {
    /// Creates a timeout layer enforcing `limit` on the wrapped chain.
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = Timeout<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Timeout {
            limit: self.limit,
            inner,
        }
    }
}
