// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

//! Timeout middleware: bounds the duration of a whole invocation.
//!
//! The deadline wraps everything inside it. In the assembled pipeline the
//! timeout sits **outside** the retry layer, so the configured duration bounds
//! the total time across all attempts and their delays, not each attempt
//! individually. A deadline hit surfaces as
//! [`CommandError::Timeout`][crate::CommandError::Timeout], which the retry
//! layer never retries.
//!
//! # Cancellation Is Best-Effort
//!
//! When the deadline elapses, the inner future is dropped and control returns
//! to the pipeline immediately. Dropping cancels the operation at its next
//! await point, but work that never yields (a blocking computation, a
//! spawned task, an I/O call that ignores cancellation) keeps running detached
//! from the caller. Authors of decorated operations should assume a timed-out
//! invocation may still be executing in the background and make their side
//! effects safe under that overlap.

mod layer;
mod service;

pub use layer::TimeoutLayer;
pub use service::Timeout;
