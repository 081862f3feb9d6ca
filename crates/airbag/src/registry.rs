// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::command::Command;
use crate::error::ConfigError;

/// Identity of a decorated operation: target plus operation name.
///
/// A call-site is the unit of configuration and state sharing: one
/// [`Command`] (and therefore one pipeline, one breaker, one result cache)
/// exists per distinct call-site, no matter how many invocations flow through
/// it.
///
/// # Examples
///
/// ```
/// use airbag::CallSite;
///
/// let site = CallSite::new("greeter", "greet");
/// assert_eq!(site.to_string(), "greeter::greet");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    target: Cow<'static, str>,
    operation: Cow<'static, str>,
}

impl CallSite {
    /// Creates a call-site identity from a target and an operation name.
    #[must_use]
    pub fn new(target: impl Into<Cow<'static, str>>, operation: impl Into<Cow<'static, str>>) -> Self {
        Self {
            target: target.into(),
            operation: operation.into(),
        }
    }

    /// The target (type, service, or component) owning the operation.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The operation name within the target.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Display for CallSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.target, self.operation)
    }
}

/// Process-wide map from call-sites to their resolved commands.
///
/// The registry replaces "one decorator instance per method" with explicit,
/// inspectable state: [`resolve`][CommandRegistry::resolve] runs its
/// initializer exactly once per call-site and hands the same shared command
/// to every caller afterwards. Concurrent first resolutions of the same site
/// agree on one winner, and unrelated call-sites initialize without
/// contending with each other.
///
/// Use [`CommandRegistry::global`] for the process-wide instance, or create
/// local registries (useful in tests) with [`CommandRegistry::new`].
#[derive(Debug, Default)]
pub struct CommandRegistry {
    slots: Mutex<HashMap<CallSite, Arc<Slot>>>,
}

#[derive(Default)]
struct Slot {
    cell: OnceCell<Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("resolved", &self.cell.get().is_some())
            .finish()
    }
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    ///
    /// Initialized lazily on first use and never torn down before process
    /// exit.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceCell<CommandRegistry> = OnceCell::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Returns the command for `site`, running `init` to create it on first
    /// resolution.
    ///
    /// `init` runs at most once per call-site even under concurrent first
    /// resolutions; losers of the race block briefly and then observe the
    /// winner's command. A failing `init` leaves the call-site unresolved, so
    /// a later resolution may try again.
    ///
    /// Re-resolving a call-site with different `Args`/`Out` types fails with
    /// [`ConfigError::CallSiteTypeMismatch`].
    pub fn resolve<Args, Out, F>(&self, site: CallSite, init: F) -> Result<Arc<Command<Args, Out>>, ConfigError>
    where
        Args: Send + Sync + 'static,
        Out: Send + Sync + 'static,
        F: FnOnce() -> Result<Command<Args, Out>, ConfigError>,
    {
        // The map lock is only held to fetch or insert the slot; the
        // (potentially contended) initialization happens per-slot so
        // unrelated call-sites never wait on each other.
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(site.clone()).or_default())
        };

        let entry = slot
            .cell
            .get_or_try_init(|| init().map(|command| Arc::new(command) as Arc<dyn Any + Send + Sync>))?;

        Arc::clone(entry)
            .downcast::<Command<Args, Out>>()
            .map_err(|_| ConfigError::CallSiteTypeMismatch(site))
    }

    /// Number of call-sites with a resolution slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns `true` if no call-site has been resolved through this
    /// registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}
