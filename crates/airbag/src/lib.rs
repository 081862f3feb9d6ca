// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Method-level resilience decoration for fallible operations.
//!
//! This crate wraps an invocable operation with a composable pipeline of
//! fault-tolerance behaviors (result caching, circuit breaking, timeout
//! enforcement, retry, and fallback), configured per call-site through a
//! declarative [`CommandOptions`] object and applied transparently on every
//! invocation.
//!
//! # Core Concepts
//!
//! - A **call-site** ([`CallSite`]) is one decorated operation: target plus
//!   operation name. Configuration and shared state (pipeline, breaker,
//!   cache) live per call-site, not per invocation.
//! - A **command** ([`Command`]) is the resolved call-site: validated
//!   options, the registered operations, and the lazily built pipeline.
//! - An **invocation** ([`Invocation`]) is one logical call: the arguments
//!   plus the continuation that runs the real operation, threaded through
//!   every pipeline layer and never shared between calls.
//! - The **registry** ([`CommandRegistry`]) maps call-sites to commands
//!   process-wide, resolving each exactly once even under concurrent first
//!   use.
//!
//! # Pipeline Layering
//!
//! The pipeline composes the layers selected by the options in a fixed
//! order: fallback around breaker around timeout around retry around the
//! real operation. The order is observable behavior: the timeout bounds the
//! whole retry loop, an open circuit fails before any retry or timeout
//! machinery runs, and the fallback catches failures from every inner layer.
//! A cached result short-circuits in front of all of it.
//!
//! # Quick Start
//!
//! ```
//! use airbag::{CallSite, Command, CommandOptions, operation};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CommandOptions {
//!     max_retry_times: 2,
//!     fallback_operation: Some("greet_quietly".into()),
//!     ..CommandOptions::default()
//! };
//!
//! let command = Command::builder(CallSite::new("greeter", "greet"), options)
//!     .primary(operation(|name: String| async move {
//!         Ok::<_, String>(format!("hello {name}"))
//!     }))
//!     .operation("greet_quietly", operation(|name: String| async move {
//!         Ok::<_, String>(format!("quiet hello {name}"))
//!     }))
//!     .build()?;
//!
//! let greeting = command.invoke("alice".to_string()).await?;
//! assert_eq!(greeting, "hello alice");
//! # Ok(())
//! # }
//! ```
//!
//! Long-lived applications resolve commands through the registry instead of
//! holding them by hand, so every caller of a call-site shares one command:
//!
//! ```
//! use airbag::{CallSite, Command, CommandOptions, CommandRegistry, operation};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CommandRegistry::new(); // or CommandRegistry::global()
//!
//! let command = registry.resolve(CallSite::new("greeter", "greet"), || {
//!     Command::builder(CallSite::new("greeter", "greet"), CommandOptions::default())
//!         .primary(operation(|name: String| async move {
//!             Ok::<_, String>(format!("hello {name}"))
//!         }))
//!         .build()
//! })?;
//! # let _ = command;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Taxonomy
//!
//! Invocations fail with a [`CommandError`] that distinguishes the primary
//! operation failing, the deadline elapsing, the circuit rejecting the call,
//! retries being exhausted, and the fallback itself failing. With a fallback
//! configured, the caller only ever observes the real result, the fallback
//! result, or [`CommandError::FallbackFailed`].
//!
//! # Observability
//!
//! The engine emits [`tracing`] events (`airbag.retry`, `airbag.timeout`,
//! `airbag.breaker`, `airbag.fallback`, `airbag.cache`) at its decision
//! points. Install any `tracing` subscriber to collect them; no subscriber,
//! no cost worth noticing.

pub mod breaker;
pub mod fallback;
pub mod retry;
pub mod timeout;

mod command;
mod error;
mod invocation;
mod options;
mod pipeline;
mod recovery;
mod registry;
mod service;

pub use command::{Command, CommandBuilder};
pub use error::{CommandError, ConfigError, OperationError};
pub use invocation::{Invocation, Operation, operation};
pub use options::{Backoff, CommandOptions, NotSet, Set};
pub use recovery::{Recovery, RecoveryKind};
pub use registry::{CallSite, CommandRegistry};
pub use service::{BoxService, Execute, Layer, Service};
