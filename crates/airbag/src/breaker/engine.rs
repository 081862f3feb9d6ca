// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// The circuit breaker state machine.
///
/// One engine exists per call-site pipeline and is shared by every concurrent
/// invocation. `enter` is consulted before execution, `exit` reports the
/// outcome afterwards; both take the state lock only for the transition
/// itself. Time checks happen outside the lock.
#[derive(Debug)]
pub(crate) struct Engine {
    state: Mutex<State>,
    threshold: u32,
    break_duration: Duration,
}

#[derive(Debug)]
enum State {
    /// Normal operation, counting consecutive failures.
    Closed { consecutive_failures: u32 },

    /// Rejecting invocations until the break window elapses. `probing` is set
    /// while the single post-window trial is in flight.
    Open { since: Instant, probing: bool },
}

/// Decision returned by [`Engine::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entered {
    /// Execute. `probe` marks the single trial after the break window.
    Accepted { probe: bool },

    /// Fail immediately without executing.
    Rejected { retry_after: Duration },
}

/// State change produced by [`Engine::exit`], reported for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    None,
    Opened,
    Closed { open_for: Duration },
    Reopened,
}

impl Engine {
    pub(crate) fn new(threshold: u32, break_duration: Duration) -> Self {
        Self {
            state: Mutex::new(State::Closed {
                consecutive_failures: 0,
            }),
            threshold,
            break_duration,
        }
    }

    /// Decides whether an invocation may execute.
    pub(crate) fn enter(&self) -> Entered {
        let now = Instant::now();
        let mut state = self.state.lock();

        match &mut *state {
            State::Closed { .. } => Entered::Accepted { probe: false },
            State::Open { since, probing } => {
                if !*probing && now.duration_since(*since) >= self.break_duration {
                    *probing = true;
                    Entered::Accepted { probe: true }
                } else {
                    // TODO: reclaim the probe slot if a trial is abandoned
                    // (caller dropped the invocation future mid-flight).
                    let retry_after = (*since + self.break_duration).duration_since(now);
                    Entered::Rejected { retry_after }
                }
            }
        }
    }

    /// Records the outcome of an execution admitted by [`Engine::enter`].
    pub(crate) fn exit(&self, success: bool, probe: bool) -> Transition {
        let now = Instant::now();
        let mut state = self.state.lock();

        match &mut *state {
            State::Closed { consecutive_failures } => {
                if success {
                    *consecutive_failures = 0;
                    return Transition::None;
                }
                *consecutive_failures = consecutive_failures.saturating_add(1);
                if *consecutive_failures >= self.threshold {
                    *state = State::Open {
                        since: now,
                        probing: false,
                    };
                    return Transition::Opened;
                }
                Transition::None
            }
            State::Open { since, .. } => {
                if !probe {
                    // A normal execution raced the transition to Open between
                    // its enter and exit; its outcome no longer matters.
                    return Transition::None;
                }
                if success {
                    let open_for = now.duration_since(*since);
                    *state = State::Closed {
                        consecutive_failures: 0,
                    };
                    Transition::Closed { open_for }
                } else {
                    *state = State::Open {
                        since: now,
                        probing: false,
                    };
                    Transition::Reopened
                }
            }
        }
    }
}
