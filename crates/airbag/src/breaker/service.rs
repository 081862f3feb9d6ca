// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::breaker::engine::{Engine, Entered, Transition};
use crate::error::CommandError;
use crate::service::Service;

/// Applies circuit breaker gating to the wrapped chain.
///
/// `Breaker` consults its engine before executing and reports the outcome
/// afterwards. Rejected invocations fail with [`CommandError::CircuitOpen`]
/// without invoking the inner service. See the [module docs][crate::breaker]
/// for the state machine.
#[derive(Debug)]
pub struct Breaker<S> {
    pub(super) engine: Arc<Engine>,
    pub(super) inner: S,
}

impl<S: Clone> Clone for Breaker<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            inner: self.inner.clone(),
        }
    }
}

impl<In, T, S> Service<In> for Breaker<S>
where
    In: Send + 'static,
    T: Send,
    S: Service<In, Out = Result<T, CommandError>>,
{
    type Out = Result<T, CommandError>;

    async fn execute(&self, input: In) -> Self::Out {
        let probe = match self.engine.enter() {
            Entered::Accepted { probe } => probe,
            Entered::Rejected { retry_after } => {
                tracing::event!(
                    name: "airbag.breaker",
                    tracing::Level::WARN,
                    state = "open",
                    retry_after_ms = retry_after.as_millis(),
                    "invocation rejected by open circuit"
                );
                return Err(CommandError::CircuitOpen { retry_after });
            }
        };

        if probe {
            tracing::event!(name: "airbag.breaker", tracing::Level::INFO, "trial execution after break window");
        }

        let out = self.inner.execute(input).await;

        match self.engine.exit(out.is_ok(), probe) {
            Transition::Opened => {
                tracing::event!(name: "airbag.breaker", tracing::Level::WARN, state = "open", "failure threshold reached, circuit opened");
            }
            Transition::Reopened => {
                tracing::event!(name: "airbag.breaker", tracing::Level::WARN, state = "open", "trial failed, break window restarted");
            }
            Transition::Closed { open_for } => {
                tracing::event!(
                    name: "airbag.breaker",
                    tracing::Level::INFO,
                    state = "closed",
                    open_for_ms = open_for.as_millis(),
                    "trial succeeded, circuit closed"
                );
            }
            Transition::None => {}
        }

        out
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::breaker::BreakerLayer;
    use crate::service::{Execute, Layer};

    const BREAK: Duration = Duration::from_millis(1000);

    /// Breaker over a service that fails while `healthy` is false.
    fn breaker_over_switchable(
        threshold: u32,
    ) -> (
        Arc<AtomicU32>,
        Arc<std::sync::atomic::AtomicBool>,
        impl Service<String, Out = Result<String, CommandError>>,
    ) {
        let calls = Arc::new(AtomicU32::new(0));
        let healthy = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let calls_in = Arc::clone(&calls);
        let healthy_in = Arc::clone(&healthy);
        let service = BreakerLayer::new(threshold, BREAK).layer(Execute::new(move |input: String| {
            calls_in.fetch_add(1, Ordering::SeqCst);
            let ok = healthy_in.load(Ordering::SeqCst);
            async move {
                if ok {
                    Ok(input)
                } else {
                    Err(CommandError::Primary("down".to_string().into()))
                }
            }
        }));
        (calls, healthy, service)
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_rejects_without_invoking_the_operation() {
        let (calls, _healthy, service) = breaker_over_switchable(2);

        let _ = service.execute("a".to_string()).await;
        let _ = service.execute("a".to_string()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let err = service.execute("a".to_string()).await.expect_err("circuit open");

        assert!(err.is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 2, "rejected invocation never reached the operation");
    }

    #[tokio::test(start_paused = true)]
    async fn one_trial_reaches_the_operation_after_the_break() {
        let (calls, healthy, service) = breaker_over_switchable(1);

        let _ = service.execute("a".to_string()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(BREAK).await;
        healthy.store(true, Ordering::SeqCst);

        let out = service.execute("a".to_string()).await;
        assert_eq!(out.expect("trial succeeds"), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 2, "exactly one trial ran");

        // Closed again: the next call flows normally.
        let out = service.execute("b".to_string()).await;
        assert_eq!(out.expect("circuit closed"), "b");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_invocation_is_rejected_while_the_trial_runs() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let gate_in = Arc::clone(&gate);
        let service = Arc::new(BreakerLayer::new(1, BREAK).layer(Execute::new(move |input: String| {
            let gate = Arc::clone(&gate_in);
            async move {
                match input.as_str() {
                    "fail" => Err(CommandError::Primary("down".to_string().into())),
                    "slow" => {
                        let _permit = gate.acquire().await;
                        Ok(input)
                    }
                    _ => Ok(input),
                }
            }
        })));

        // Open the circuit, then let the break window elapse.
        let _ = service.execute("fail".to_string()).await;
        tokio::time::advance(BREAK).await;

        // The trial enters and parks on the gate.
        let trial = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.execute("slow".to_string()).await }
        });
        tokio::task::yield_now().await;

        // While the trial is in flight, other invocations stay rejected.
        let err = service.execute("other".to_string()).await.expect_err("trial holds the slot");
        assert!(err.is_circuit_open());

        // Release the trial; its success closes the circuit.
        gate.add_permits(1);
        let out = trial.await.expect("trial task completes");
        assert_eq!(out.expect("trial succeeds"), "slow");

        let out = service.execute("after".to_string()).await;
        assert_eq!(out.expect("circuit closed"), "after");
    }
}
