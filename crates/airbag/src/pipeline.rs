// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;

use crate::breaker::BreakerLayer;
use crate::error::CommandError;
use crate::fallback::FallbackLayer;
use crate::invocation::{Invocation, Operation, Proceed};
use crate::options::CommandOptions;
use crate::retry::RetryLayer;
use crate::service::{BoxService, Layer};
use crate::timeout::TimeoutLayer;

/// The assembled resilience chain of one call-site.
pub(crate) type Pipeline<Args, Out> = BoxService<Invocation<Args, Out>, Result<Out, CommandError>>;

/// Composes the resilience layers selected by `options` around the base
/// execution stage.
///
/// Layer order is fixed, innermost to outermost:
///
/// 1. proceed: invoke the continuation carried by the invocation,
/// 2. retry: renewed attempts re-run only the real operation,
/// 3. timeout: outside retry, so the deadline bounds the whole retry loop,
/// 4. breaker: outermost gate short of the fallback, making an open circuit
///    the cheapest possible failure,
/// 5. fallback: wraps everything, catching failures from every inner layer.
///
/// This order is observable behavior, not an implementation detail: moving
/// the timeout inside retry would bound each attempt instead of the total,
/// and moving the breaker inward would burn retry and timeout work on a
/// circuit that is already known to be open.
pub(crate) fn assemble<Args, Out>(
    options: &CommandOptions,
    fallback: Option<Operation<Args, Out>>,
) -> Pipeline<Args, Out>
where
    Args: Clone + Send + 'static,
    Out: Send + 'static,
{
    let mut pipeline: Pipeline<Args, Out> = BoxService::new(Proceed);

    if options.retry_enabled() {
        pipeline = BoxService::new(RetryLayer::from_options(options).layer(pipeline));
    }
    if options.timeout_enabled() {
        pipeline = BoxService::new(TimeoutLayer::new(options.timeout()).layer(pipeline));
    }
    if options.enable_circuit_breaker {
        pipeline = BoxService::new(BreakerLayer::from_options(options).layer(pipeline));
    }
    if let Some(operation) = fallback {
        pipeline = BoxService::new(FallbackLayer::new(operation).layer(pipeline));
    }

    pipeline
}

/// Build-once holder for a command's pipeline.
///
/// The first invocation of a call-site builds the pipeline; every concurrent
/// and subsequent invocation observes the same fully built instance. The fast
/// path is a lock-free read; the build path is entered at most once per cell
/// lifetime, and readers can never observe a partially built pipeline.
pub(crate) struct PipelineCell<Args, Out> {
    cell: OnceCell<Pipeline<Args, Out>>,
    builds: AtomicU64,
}

impl<Args, Out> PipelineCell<Args, Out> {
    pub(crate) fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            builds: AtomicU64::new(0),
        }
    }

    /// Returns the pipeline, building it on first use.
    pub(crate) fn get_or_build(&self, build: impl FnOnce() -> Pipeline<Args, Out>) -> &Pipeline<Args, Out> {
        self.cell.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            build()
        })
    }

    /// Number of times the build closure actually ran.
    pub(crate) fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

impl<Args, Out> Debug for PipelineCell<Args, Out> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineCell")
            .field("built", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::invocation::operation;
    use crate::service::Service;

    fn echo() -> Operation<String, String> {
        operation(|input: String| async move { Ok::<_, String>(input) })
    }

    #[tokio::test]
    async fn bare_options_assemble_to_the_proceed_stage() {
        let pipeline = assemble::<String, String>(&CommandOptions::default(), None);

        let out = pipeline.execute(Invocation::new("hi".to_string(), echo())).await;

        assert_eq!(out.expect("proceed runs the continuation"), "hi");
    }

    #[tokio::test]
    async fn fallback_layer_is_outermost() {
        let options = CommandOptions {
            enable_circuit_breaker: true,
            exceptions_allowed_before_breaking: 1,
            ..CommandOptions::default()
        };
        let fallback = operation(|name: String| async move { Ok::<_, String>(format!("fallback-{name}")) });
        let pipeline = assemble(&options, Some(fallback));

        let failing = operation(|_: String| async move { Err::<String, _>("down".to_string()) });

        // First call opens the circuit; the fallback covers it.
        let out = pipeline.execute(Invocation::new("a".to_string(), failing.clone())).await;
        assert_eq!(out.expect("fallback covers the failure"), "fallback-a");

        // Second call is rejected by the breaker; the fallback still covers.
        let out = pipeline.execute(Invocation::new("b".to_string(), failing)).await;
        assert_eq!(out.expect("fallback covers the open circuit"), "fallback-b");
    }

    #[test]
    fn concurrent_first_use_builds_exactly_once() {
        let cell: Arc<PipelineCell<String, String>> = Arc::new(PipelineCell::new());
        let options = CommandOptions::default();

        std::thread::scope(|scope| {
            for _ in 0..16 {
                let cell = Arc::clone(&cell);
                let options = options.clone();
                scope.spawn(move || {
                    let pipeline = cell.get_or_build(|| assemble(&options, None));
                    // Every thread observes a fully built pipeline.
                    let _ = pipeline.clone();
                });
            }
        });

        assert_eq!(cell.builds(), 1);
    }

    #[tokio::test]
    async fn built_pipeline_is_shared_not_rebuilt() {
        let cell: PipelineCell<String, String> = PipelineCell::new();
        let options = CommandOptions::default();

        let _ = cell.get_or_build(|| assemble(&options, None));
        let pipeline = cell.get_or_build(|| panic!("second build must not run"));

        let out = pipeline.execute(Invocation::new("hi".to_string(), echo())).await;
        assert_eq!(out.expect("pipeline works"), "hi");
        assert_eq!(cell.builds(), 1);
    }
}
