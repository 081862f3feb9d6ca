// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

//! Circuit breaker middleware: gates execution after repeated failures.
//!
//! The breaker tracks **consecutive** failures of the wrapped chain. Once the
//! configured threshold is reached the circuit opens: invocations fail
//! immediately with [`CommandError::CircuitOpen`][crate::CommandError::CircuitOpen]
//! and never reach the (presumably unhealthy) operation. After the break
//! window elapses, exactly one trial invocation is allowed through:
//!
//! - trial succeeds → the circuit closes and the failure counter resets,
//! - trial fails → the circuit stays open and the break window restarts.
//!
//! While a trial is in flight, other invocations keep being rejected. Any
//! success while the circuit is closed resets the failure counter; there is no
//! persistent half-open state, only the single trial.
//!
//! In the assembled pipeline the breaker is the outermost layer short of the
//! fallback, so an open circuit is the fastest failure: one state check, no
//! timeout or retry machinery, no real-call work.
//!
//! All state transitions are atomic relative to concurrent invocations of the
//! same call-site; the state lock is held only around the transition itself,
//! never during execution.

mod engine;
mod layer;
mod service;

pub use layer::BreakerLayer;
pub use service::Breaker;
