// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use crate::error::CommandError;
use crate::recovery::{Recovery, RecoveryKind};
use crate::retry::RetryDelays;
use crate::service::Service;

/// Applies retry logic to the wrapped chain.
///
/// `Retry` re-invokes its inner service on failures classified as
/// recoverable, cloning the input for every attempt so each attempt observes
/// the original call's context. See the [module docs][crate::retry] for the
/// full semantics.
#[derive(Debug, Clone)]
pub struct Retry<S> {
    pub(super) max_retries: u32,
    pub(super) delays: RetryDelays,
    pub(super) inner: S,
}

impl<In, T, S> Service<In> for Retry<S>
where
    In: Clone + Send + 'static,
    T: Send,
    S: Service<In, Out = Result<T, CommandError>>,
{
    type Out = Result<T, CommandError>;

    async fn execute(&self, input: In) -> Self::Out {
        let mut delays = self.delays.iter();
        let mut attempt: u32 = 0;

        loop {
            match self.inner.execute(input.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && err.recovery() == RecoveryKind::Retry => {
                    let delay = delays.next().unwrap_or_default();
                    tracing::event!(
                        name: "airbag.retry",
                        tracing::Level::WARN,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "attempt failed, retrying"
                    );
                    attempt = attempt.saturating_add(1);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) if attempt > 0 => {
                    return Err(CommandError::RetryExhausted {
                        attempts: attempt.saturating_add(1),
                        source: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}
