// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use crate::error::CommandError;
use crate::service::Service;

/// Enforces a deadline on the wrapped chain.
///
/// If the inner service does not complete within the limit, the invocation is
/// abandoned from the caller's perspective and reported as
/// [`CommandError::Timeout`]. See the [module docs][crate::timeout] for the
/// cancellation caveat.
#[derive(Debug, Clone)]
pub struct Timeout<S> {
    pub(super) limit: Duration,
    pub(super) inner: S,
}

impl<In, T, S> Service<In> for Timeout<S>
where
    In: Send + 'static,
    T: Send,
    S: Service<In, Out = Result<T, CommandError>>,
{
    type Out = Result<T, CommandError>;

    async fn execute(&self, input: In) -> Self::Out {
        let limit = self.limit;
        match tokio::time::timeout(limit, self.inner.execute(input)).await {
            Ok(out) => out,
            Err(_elapsed) => {
                tracing::event!(
                    name: "airbag.timeout",
                    tracing::Level::WARN,
                    timeout_ms = limit.as_millis(),
                    "invocation abandoned at deadline"
                );
                Err(CommandError::Timeout { limit })
            }
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::service::{Execute, Layer};
    use crate::timeout::TimeoutLayer;

    #[tokio::test(start_paused = true)]
    async fn slow_operation_times_out() {
        let service = TimeoutLayer::new(Duration::from_millis(100)).layer(Execute::new(|x: i32| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, CommandError>(x)
        }));

        let err = service.execute(1).await.expect_err("deadline elapses first");

        assert!(matches!(err, CommandError::Timeout { limit } if limit == Duration::from_millis(100)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_operation_passes_through() {
        let service = TimeoutLayer::new(Duration::from_millis(100)).layer(Execute::new(|x: i32| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, CommandError>(x * 2)
        }));

        let out = service.execute(4).await;

        assert_eq!(out.expect("completes before the deadline"), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn inner_failure_is_not_rewritten() {
        let service = TimeoutLayer::new(Duration::from_millis(100))
            .layer(Execute::new(|_: i32| async move {
                Err::<i32, _>(CommandError::Primary("boom".to_string().into()))
            }));

        let err = service.execute(1).await.expect_err("inner fails");

        assert!(matches!(err, CommandError::Primary(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_work_does_not_complete_in_the_foreground() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let service = TimeoutLayer::new(Duration::from_millis(50)).layer(Execute::new(move |x: i32| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, CommandError>(x)
            }
        }));

        let err = service.execute(1).await.expect_err("times out");

        assert!(err.is_timeout());
        assert!(!finished.load(Ordering::SeqCst), "the dropped future never reached its tail");
    }
}
