// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use crate::error::CommandError;
use crate::invocation::{Invocation, Operation};
use crate::service::Service;

/// Invokes an alternate operation when the wrapped chain fails.
///
/// See the [module docs][crate::fallback] for semantics, in particular how the
/// original arguments reach the fallback under concurrency.
#[derive(Debug)]
pub struct Fallback<Args, Out, S> {
    pub(super) operation: Operation<Args, Out>,
    pub(super) inner: S,
}

impl<Args, Out, S: Clone> Clone for Fallback<Args, Out, S> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<Args, Out, S> Service<Invocation<Args, Out>> for Fallback<Args, Out, S>
where
    Args: Clone + Send + 'static,
    Out: Send + 'static,
    S: Service<Invocation<Args, Out>, Out = Result<Out, CommandError>>,
{
    type Out = Result<Out, CommandError>;

    async fn execute(&self, invocation: Invocation<Args, Out>) -> Self::Out {
        // Capture the arguments of this very invocation before the inner
        // chain consumes it; the fallback must observe the context of the
        // call that entered here, not whatever is in flight elsewhere.
        let args = invocation.args().clone();

        match self.inner.execute(invocation).await {
            Ok(value) => Ok(value),
            Err(covering) => {
                tracing::event!(
                    name: "airbag.fallback",
                    tracing::Level::WARN,
                    error = %covering,
                    "primary path failed, invoking fallback"
                );
                match self.operation.execute(args).await {
                    Ok(value) => Ok(value),
                    Err(source) => Err(CommandError::FallbackFailed {
                        source,
                        covering: Box::new(covering),
                    }),
                }
            }
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::fallback::FallbackLayer;
    use crate::invocation::{Proceed, operation};
    use crate::service::{BoxService, Layer};

    fn failing_primary() -> Operation<String, String> {
        operation(|_: String| async move { Err::<String, _>("primary down".to_string()) })
    }

    #[tokio::test]
    async fn fallback_not_consulted_on_success() {
        let fallback_calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fallback_calls);
        let service = FallbackLayer::new(operation(move |_: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>("fallback".to_string()) }
        }))
        .layer(Proceed);

        let primary = operation(|name: String| async move { Ok::<_, String>(format!("hello {name}")) });
        let out = service.execute(Invocation::new("alice".to_string(), primary)).await;

        assert_eq!(out.expect("primary succeeds"), "hello alice");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_receives_the_original_arguments() {
        let service = FallbackLayer::new(operation(|name: String| async move {
            Ok::<_, String>(format!("fallback-{name}"))
        }))
        .layer(Proceed);

        let out = service.execute(Invocation::new("alice".to_string(), failing_primary())).await;

        assert_eq!(out.expect("fallback supplies the result"), "fallback-alice");
    }

    #[tokio::test]
    async fn fallback_invoked_exactly_once_per_call() {
        let fallback_calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fallback_calls);
        let service = FallbackLayer::new(operation(move |name: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(name) }
        }))
        .layer(Proceed);

        let _ = service.execute(Invocation::new("a".to_string(), failing_primary())).await;

        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_fallback_reports_both_paths() {
        let service = FallbackLayer::new(operation(|_: String| async move {
            Err::<String, _>("fallback down too".to_string())
        }))
        .layer(Proceed);

        let err = service
            .execute(Invocation::new("a".to_string(), failing_primary()))
            .await
            .expect_err("both paths fail");

        match err {
            CommandError::FallbackFailed { source, covering } => {
                assert_eq!(source.to_string(), "fallback down too");
                assert!(matches!(*covering, CommandError::Primary(_)));
            }
            other => panic!("expected FallbackFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_invocations_observe_their_own_arguments() {
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let barrier_in = Arc::clone(&barrier);

        // The primary holds both invocations in flight simultaneously before
        // failing, so the fallbacks run against a genuinely shared pipeline.
        let primary = operation(move |_: String| {
            let barrier = Arc::clone(&barrier_in);
            async move {
                barrier.wait().await;
                Err::<String, _>("primary down".to_string())
            }
        });

        let service: Arc<BoxService<Invocation<String, String>, Result<String, CommandError>>> =
            Arc::new(BoxService::new(
                FallbackLayer::new(operation(|name: String| async move {
                    Ok::<_, String>(format!("fallback-{name}"))
                }))
                .layer(Proceed),
            ));

        let a = tokio::spawn({
            let service = Arc::clone(&service);
            let primary = primary.clone();
            async move { service.execute(Invocation::new("alice".to_string(), primary)).await }
        });
        let b = tokio::spawn({
            let service = Arc::clone(&service);
            let primary = primary.clone();
            async move { service.execute(Invocation::new("bob".to_string(), primary)).await }
        });

        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.expect("task a").expect("fallback a"), "fallback-alice");
        assert_eq!(b.expect("task b").expect("fallback b"), "fallback-bob");
    }

    #[tokio::test]
    async fn covers_non_primary_failures_too() {
        struct TimesOut;

        impl Service<Invocation<String, String>> for TimesOut {
            type Out = Result<String, CommandError>;

            async fn execute(&self, _invocation: Invocation<String, String>) -> Self::Out {
                Err(CommandError::Timeout {
                    limit: Duration::from_millis(50),
                })
            }
        }

        let service = FallbackLayer::new(operation(|name: String| async move {
            Ok::<_, String>(format!("fallback-{name}"))
        }))
        .layer(TimesOut);

        let out = service
            .execute(Invocation::new("alice".to_string(), failing_primary()))
            .await;

        assert_eq!(out.expect("fallback covers the timeout"), "fallback-alice");
    }
}
