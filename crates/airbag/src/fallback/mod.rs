// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

//! Fallback middleware: supplies an alternate result when the primary path
//! ultimately fails.
//!
//! The fallback layer wraps the entire composed chain, so it catches every
//! failure kind the inner layers can surface: a failing primary, exhausted
//! retries, a deadline hit, an open circuit. On any of them it invokes the
//! configured fallback operation **with the original invocation's arguments**
//! and returns the fallback's value as the observable outcome.
//!
//! The arguments are captured from the invocation instance that entered the
//! layer, never from state shared with other calls: concurrent invocations
//! racing through the same shared pipeline each see their own arguments in
//! their own fallback.
//!
//! The fallback runs at most once per logical call. If it fails too, the
//! caller receives [`CommandError::FallbackFailed`][crate::CommandError::FallbackFailed],
//! carrying both the fallback's error and the primary-path failure it was
//! covering.

mod layer;
mod service;

pub use layer::FallbackLayer;
pub use service::Fallback;
