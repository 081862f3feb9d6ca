// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::engine::Engine;
use crate::breaker::service::Breaker;
use crate::options::CommandOptions;
use crate::service::Layer;

/// Configures the circuit breaker middleware.
///
/// Each call to [`layer`][Layer::layer] creates a fresh breaker engine, so
/// every assembled pipeline tracks its own call-site's health.
#[derive(Debug, Clone)]
pub struct BreakerLayer {
    threshold: u32,
    break_duration: Duration,
}

impl BreakerLayer {
    /// Creates a breaker layer that opens after `threshold` consecutive
    /// failures and stays open for `break_duration`.
    #[must_use]
    pub fn new(threshold: u32, break_duration: Duration) -> Self {
        Self {
            threshold,
            break_duration,
        }
    }

    pub(crate) fn from_options(options: &CommandOptions) -> Self {
        Self {
            threshold: options.exceptions_allowed_before_breaking,
            break_duration: options.break_duration(),
        }
    }
}

impl<S> Layer<S> for BreakerLayer {
    type Service = Breaker<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Breaker {
            engine: Arc::new(Engine::new(self.threshold, self.break_duration)),
            inner,
        }
    }
}
