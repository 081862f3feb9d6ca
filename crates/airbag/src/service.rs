// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;

/// An async function `In → Out` that processes inputs.
///
/// This trait is the substrate every resilience middleware in this crate is
/// built on. Services take `&self` and may be invoked concurrently; shared
/// state lives behind the service, per-call state travels with the input.
///
/// Implement it directly for custom middleware, or use [`Execute`] to wrap an
/// async function or closure.
///
/// # Examples
///
/// ```
/// use airbag::Service;
///
/// struct Greeter;
///
/// impl Service<String> for Greeter {
///     type Out = String;
///
///     async fn execute(&self, name: String) -> Self::Out {
///         format!("hello {name}")
///     }
/// }
/// ```
pub trait Service<In>: Send + Sync {
    /// The output type returned by this service.
    type Out;

    /// Processes the input and returns the output.
    ///
    /// The returned future must be [`Send`] for compatibility with
    /// multi-threaded async runtimes.
    fn execute(&self, input: In) -> impl Future<Output = Self::Out> + Send;
}

impl<S, In> Service<In> for Arc<S>
where
    S: Service<In>,
{
    type Out = S::Out;

    fn execute(&self, input: In) -> impl Future<Output = Self::Out> + Send {
        (**self).execute(input)
    }
}

/// Wraps an inner service with additional behavior, producing a new service.
///
/// Layers are how the pipeline assembler composes resilience middleware: each
/// middleware ships a layer type holding its configuration, and
/// [`layer`][Layer::layer] wires that configuration around the service built
/// so far.
pub trait Layer<S> {
    /// The service produced by wrapping `inner`.
    type Service;

    /// Wraps `inner` with this layer's behavior.
    fn layer(&self, inner: S) -> Self::Service;
}

/// A service implementation that wraps a function for ad-hoc service creation.
///
/// `Execute` turns any async function or closure into a [`Service`], which is
/// how operations are handed to the engine without defining custom types.
///
/// # Examples
///
/// ```
/// use airbag::{Execute, Service};
///
/// # async fn example() {
/// let double = Execute::new(|x: i32| async move { x * 2 });
/// assert_eq!(double.execute(21).await, 42);
/// # }
/// ```
#[derive(Clone)]
pub struct Execute<F>(F);

impl<F> Execute<F> {
    /// Creates a new `Execute` service from a function or closure.
    #[must_use]
    pub fn new<In, Out, Fut>(f: F) -> Self
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        In: Send + 'static,
        Out: Send + 'static,
    {
        Self(f)
    }
}

impl<F, Fut, In, Out> Service<In> for Execute<F>
where
    F: Fn(In) -> Fut + Send + Sync,
    Fut: Future<Output = Out> + Send,
{
    type Out = Out;

    fn execute(&self, input: In) -> impl Future<Output = Self::Out> + Send {
        self.0(input)
    }
}

impl<F> Debug for Execute<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execute").finish_non_exhaustive()
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Dyn-compatible form of [`Service`], used internally for type erasure.
trait ErasedService<In, Out>: Send + Sync {
    fn execute_boxed(&self, input: In) -> BoxFuture<'_, Out>;
}

impl<S, In, Out> ErasedService<In, Out> for S
where
    S: Service<In, Out = Out>,
    In: Send + 'static,
{
    fn execute_boxed(&self, input: In) -> BoxFuture<'_, Out> {
        Box::pin(self.execute(input))
    }
}

/// A clonable, type-erased [`Service`].
///
/// The pipeline assembler composes middleware at runtime based on a
/// configuration object, so the concrete service type cannot be spelled out at
/// compile time. `BoxService` hides it behind an `Arc`, making the assembled
/// pipeline cheap to share across every invocation of a call-site.
pub struct BoxService<In, Out>(Arc<dyn ErasedService<In, Out>>);

impl<In, Out> BoxService<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    /// Erases the type of `service`.
    #[must_use]
    pub fn new<S>(service: S) -> Self
    where
        S: Service<In, Out = Out> + 'static,
    {
        Self(Arc::new(service))
    }
}

impl<In, Out> Service<In> for BoxService<In, Out>
where
    In: Send,
    Out: Send,
{
    type Out = Out;

    async fn execute(&self, input: In) -> Self::Out {
        self.0.execute_boxed(input).await
    }
}

impl<In, Out> Clone for BoxService<In, Out> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<In, Out> Debug for BoxService<In, Out> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxService").finish()
    }
}
