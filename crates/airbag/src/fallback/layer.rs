// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use crate::fallback::service::Fallback;
use crate::invocation::Operation;
use crate::service::Layer;

/// Configures the fallback middleware with the alternate operation to invoke
/// on failure.
#[derive(Debug)]
pub struct FallbackLayer<Args, Out> {
    operation: Operation<Args, Out>,
}

impl<Args, Out> FallbackLayer<Args, Out> {
    /// Creates a fallback layer invoking `operation` when the wrapped chain
    /// fails.
    #[must_use]
    pub fn new(operation: Operation<Args, Out>) -> Self {
        Self { operation }
    }
}

impl<Args, Out> Clone for FallbackLayer<Args, Out> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
        }
    }
}

impl<Args, Out, S> Layer<S> for FallbackLayer<Args, Out> {
    type Service = Fallback<Args, Out, S>;

    fn layer(&self, inner: S) -> Self::Service {
        Fallback {
            operation: self.operation.clone(),
            inner,
        }
    }
}
