// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use airbag_cache::TtlCache;
use serde::Serialize;

use crate::error::{CommandError, ConfigError};
use crate::invocation::{Invocation, Operation};
use crate::options::{CommandOptions, DEFAULT_CACHE_CAPACITY, NotSet, Set};
use crate::pipeline::{PipelineCell, assemble};
use crate::registry::CallSite;
use crate::service::Service;

/// A decorated operation: one call-site with its resolved resilience
/// configuration.
///
/// A `Command` owns everything that is shared across invocations of its
/// call-site: the validated options, the lazily built pipeline, the breaker
/// state inside it, and the result cache. Each invocation's context stays
/// private to that invocation.
///
/// Commands are built through [`Command::builder`] and usually resolved
/// through a [`CommandRegistry`][crate::CommandRegistry] so every caller of
/// the same call-site shares one instance.
///
/// # Invocation Flow
///
/// [`invoke`][Command::invoke] consults the result cache first (when caching
/// is enabled): a hit returns the stored value and bypasses the pipeline
/// entirely, so cached calls do not count toward circuit breaker statistics.
/// On a miss the invocation runs through the pipeline, and a successful
/// result (real or fallback) is stored with the configured TTL.
pub struct Command<Args, Out> {
    site: CallSite,
    options: CommandOptions,
    primary: Operation<Args, Out>,
    fallback: Option<Operation<Args, Out>>,
    caching: Option<Caching<Args, Out>>,
    pipeline: PipelineCell<Args, Out>,
}

struct Caching<Args, Out> {
    key_of: KeyFn<Args>,
    ttl: Duration,
    store: TtlCache<String, Out>,
}

/// Derives the cache key fragment for an argument list.
///
/// Returning `None` marks the arguments as uncacheable for this call; the
/// invocation then bypasses the cache instead of failing.
struct KeyFn<Args>(Arc<dyn Fn(&Args) -> Option<String> + Send + Sync>);

impl<Args> KeyFn<Args> {
    fn new<F>(f: F) -> Self
    where
        F: Fn(&Args) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn call(&self, args: &Args) -> Option<String> {
        (self.0)(args)
    }
}

impl<Args> Clone for KeyFn<Args> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<Args> Debug for KeyFn<Args> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFn").finish()
    }
}

impl<Args, Out> Command<Args, Out> {
    /// Starts building a command for `site` with the given options.
    ///
    /// The returned builder requires the primary operation to be set before
    /// [`build`][CommandBuilder::build] becomes available.
    #[must_use]
    pub fn builder(site: CallSite, options: CommandOptions) -> CommandBuilder<Args, Out, NotSet> {
        CommandBuilder {
            site,
            options,
            primary: None,
            operations: HashMap::new(),
            key_fn: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            _state: std::marker::PhantomData,
        }
    }

    /// The call-site this command decorates.
    #[must_use]
    pub fn site(&self) -> &CallSite {
        &self.site
    }

    /// The resolved, immutable options of this call-site.
    #[must_use]
    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    #[cfg(test)]
    pub(crate) fn pipeline_builds(&self) -> u64 {
        self.pipeline.builds()
    }
}

impl<Args, Out> Command<Args, Out>
where
    Args: Clone + Send + 'static,
    Out: Clone + Send + 'static,
{
    /// Invokes the decorated operation with `args`.
    ///
    /// The registered primary operation serves as the continuation. See the
    /// [type docs][Command] for the invocation flow.
    pub async fn invoke(&self, args: Args) -> Result<Out, CommandError> {
        self.invoke_with(args, self.primary.clone()).await
    }

    /// Invokes the call-site with an explicit continuation.
    ///
    /// This is the entry point for interception layers that carry their own
    /// "proceed" handle per call. Caching, pipeline, and breaker state are
    /// exactly those of [`invoke`][Command::invoke]; only the executed
    /// operation differs.
    pub async fn invoke_with(&self, args: Args, proceed: Operation<Args, Out>) -> Result<Out, CommandError> {
        let cache_key = self.derive_cache_key(&args);

        if let (Some(caching), Some(key)) = (&self.caching, &cache_key) {
            if let Some(value) = caching.store.get(key) {
                tracing::event!(name: "airbag.cache", tracing::Level::DEBUG, site = %self.site, "cache hit");
                return Ok(value);
            }
        }

        let pipeline = self
            .pipeline
            .get_or_build(|| assemble(&self.options, self.fallback.clone()));

        let out = pipeline.execute(Invocation::new(args, proceed)).await;

        if let (Some(caching), Some(key), Ok(value)) = (&self.caching, cache_key, &out) {
            caching.store.insert(key, value.clone(), caching.ttl);
            tracing::event!(name: "airbag.cache", tracing::Level::DEBUG, site = %self.site, "result stored");
        }

        out
    }

    fn derive_cache_key(&self, args: &Args) -> Option<String> {
        let caching = self.caching.as_ref()?;
        match caching.key_of.call(args) {
            Some(fragment) => Some(format!("{}|{fragment}", self.site)),
            None => {
                tracing::event!(
                    name: "airbag.cache",
                    tracing::Level::WARN,
                    site = %self.site,
                    "cache key could not be derived, bypassing cache for this call"
                );
                None
            }
        }
    }
}

impl<Args, Out> Debug for Command<Args, Out> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("site", &self.site)
            .field("options", &self.options)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Command`].
///
/// The `Primary` type parameter tracks whether the required primary operation
/// has been supplied: [`build`][CommandBuilder::build] exists only once it
/// has, so an unconfigured command is a compile error rather than a runtime
/// surprise.
pub struct CommandBuilder<Args, Out, Primary = Set> {
    site: CallSite,
    options: CommandOptions,
    primary: Option<Operation<Args, Out>>,
    operations: HashMap<String, Operation<Args, Out>>,
    key_fn: Option<KeyFn<Args>>,
    cache_capacity: usize,
    _state: std::marker::PhantomData<fn() -> Primary>,
}

impl<Args, Out, Primary> CommandBuilder<Args, Out, Primary> {
    /// Sets the primary operation, the business logic being decorated.
    #[must_use]
    pub fn primary(self, operation: Operation<Args, Out>) -> CommandBuilder<Args, Out, Set> {
        CommandBuilder {
            site: self.site,
            options: self.options,
            primary: Some(operation),
            operations: self.operations,
            key_fn: self.key_fn,
            cache_capacity: self.cache_capacity,
            _state: std::marker::PhantomData,
        }
    }

    /// Registers a named alternate operation on this command's target.
    ///
    /// The options' `fallback_operation` identifier is resolved against these
    /// registrations when the command is built.
    #[must_use]
    pub fn operation(mut self, name: impl Into<String>, operation: Operation<Args, Out>) -> Self {
        self.operations.insert(name.into(), operation);
        self
    }

    /// Derives cache keys by serializing the arguments with `serde_json`.
    ///
    /// Equal arguments always serialize identically, so equal calls map to
    /// the same cache entry. Arguments that fail to serialize bypass the
    /// cache for that call.
    #[must_use]
    pub fn cache_key(mut self) -> Self
    where
        Args: Serialize,
    {
        self.key_fn = Some(KeyFn::new(|args: &Args| serde_json::to_string(args).ok()));
        self
    }

    /// Derives cache keys with a custom function.
    ///
    /// The function must be deterministic and collision-free over the
    /// argument values: equal arguments must produce the same key, and
    /// unequal arguments must not.
    #[must_use]
    pub fn cache_key_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Args) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(KeyFn::new(move |args: &Args| Some(f(args))));
        self
    }

    /// Overrides the result cache capacity (default: 1024 entries).
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

impl<Args, Out> CommandBuilder<Args, Out, Set> {
    /// Validates the configuration and produces the command.
    ///
    /// This is the fail-fast point: an unresolvable fallback identifier, a
    /// missing cache key derivation, or out-of-range options surface here,
    /// once, instead of on some later invocation.
    pub fn build(mut self) -> Result<Command<Args, Out>, ConfigError> {
        self.options.validate()?;

        let fallback = match &self.options.fallback_operation {
            Some(name) => Some(
                self.operations
                    .remove(name)
                    .ok_or_else(|| ConfigError::UnknownFallback(name.clone()))?,
            ),
            None => None,
        };

        let caching = if self.options.cache_enabled() {
            let key_of = self.key_fn.ok_or(ConfigError::MissingCacheKey)?;
            Some(Caching {
                key_of,
                ttl: self.options.cache_ttl(),
                store: TtlCache::new(self.cache_capacity),
            })
        } else {
            None
        };

        Ok(Command {
            site: self.site,
            options: self.options,
            primary: self.primary.expect("primary is set in the Set state"),
            fallback,
            caching,
            pipeline: PipelineCell::new(),
        })
    }
}

impl<Args, Out, Primary> Debug for CommandBuilder<Args, Out, Primary> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("site", &self.site)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
