// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};

use crate::error::{CommandError, OperationError};
use crate::service::{BoxService, Execute, Service};

/// An invocable operation: async `Args → Result<Out, _>` with a type-erased
/// error.
///
/// Primary and fallback operations are registered on a command in this form;
/// use [`operation`] to lift an async function or closure into it.
pub type Operation<Args, Out> = BoxService<Args, Result<Out, OperationError>>;

/// Lifts an async function or closure into an [`Operation`].
///
/// The function's error type is boxed into [`OperationError`], so operations
/// can surface whatever error type suits them.
///
/// # Examples
///
/// ```
/// use airbag::{Operation, operation};
///
/// let greet: Operation<String, String> = operation(|name: String| async move {
///     Ok::<_, String>(format!("hello {name}"))
/// });
/// ```
pub fn operation<Args, Out, E, F, Fut>(f: F) -> Operation<Args, Out>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, E>> + Send + 'static,
    E: Into<OperationError>,
    Args: Send + 'static,
    Out: Send + 'static,
{
    BoxService::new(Execute::new(move |args: Args| {
        let fut = f(args);
        async move { fut.await.map_err(Into::into) }
    }))
}

/// The per-call context threaded through every pipeline layer.
///
/// An `Invocation` carries the original arguments and the continuation that
/// executes the real operation. It is created fresh for each logical call and
/// owned by that call alone: the pipeline object is shared across concurrent
/// invocations, but each invocation's context never is. Layers receive the
/// context by value and pass it (or, for retries, a clone of it) inward, so
/// the outermost layers always observe the context of the call that actually
/// entered them.
pub struct Invocation<Args, Out> {
    args: Args,
    proceed: Operation<Args, Out>,
}

impl<Args, Out> Invocation<Args, Out> {
    /// Creates the context for one logical call.
    #[must_use]
    pub fn new(args: Args, proceed: Operation<Args, Out>) -> Self {
        Self { args, proceed }
    }

    /// The arguments of the original call.
    #[must_use]
    pub fn args(&self) -> &Args {
        &self.args
    }
}

impl<Args: Clone, Out> Clone for Invocation<Args, Out> {
    fn clone(&self) -> Self {
        Self {
            args: self.args.clone(),
            proceed: self.proceed.clone(),
        }
    }
}

impl<Args, Out> Debug for Invocation<Args, Out> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation").finish_non_exhaustive()
    }
}

/// The innermost pipeline stage: runs the invocation's continuation.
///
/// Failures of the real operation surface as [`CommandError::Primary`]; every
/// outer layer builds on that classification.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Proceed;

impl<Args, Out> Service<Invocation<Args, Out>> for Proceed
where
    Args: Send + 'static,
    Out: Send + 'static,
{
    type Out = Result<Out, CommandError>;

    async fn execute(&self, invocation: Invocation<Args, Out>) -> Self::Out {
        let Invocation { args, proceed } = invocation;
        proceed.execute(args).await.map_err(CommandError::Primary)
    }
}
