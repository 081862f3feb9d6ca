// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

use std::time::Duration;

use crate::options::Backoff;

/// The jitter range applied around a delay: ±25%.
const JITTER_SPREAD: f64 = 0.5;

/// Generates the sequence of delays between retry attempts.
#[derive(Debug, Clone)]
pub(crate) struct RetryDelays {
    backoff: Backoff,
    interval: Duration,
    jitter: bool,
}

impl RetryDelays {
    pub(crate) fn new(backoff: Backoff, interval: Duration, jitter: bool) -> Self {
        Self {
            backoff,
            interval,
            jitter,
        }
    }

    /// Returns a fresh delay sequence for one invocation's retry loop.
    pub(crate) fn iter(&self) -> impl Iterator<Item = Duration> + use<> {
        DelaysIter {
            backoff: self.backoff,
            interval: self.interval,
            jitter: self.jitter,
            attempt: 0,
        }
    }
}

#[derive(Debug)]
struct DelaysIter {
    backoff: Backoff,
    interval: Duration,
    jitter: bool,
    attempt: u32,
}

impl Iterator for DelaysIter {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        // Zero interval means "retry immediately", jitter or not.
        if self.interval.is_zero() {
            return Some(Duration::ZERO);
        }

        let base = match self.backoff {
            Backoff::Constant => self.interval,
            Backoff::Exponential => mul_pow2(self.interval, self.attempt),
        };
        self.attempt = self.attempt.saturating_add(1);

        Some(if self.jitter { apply_jitter(base) } else { base })
    }
}

fn mul_pow2(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt))
}

/// Spreads `delay` uniformly across `[0.75 × delay, 1.25 × delay]`.
fn apply_jitter(delay: Duration) -> Duration {
    let factor = (1.0 - JITTER_SPREAD / 2.0) + fastrand::f64() * JITTER_SPREAD;
    saturating_from_secs(delay.as_secs_f64() * factor)
}

fn saturating_from_secs(secs: f64) -> Duration {
    if secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_yields_the_same_delay_forever() {
        let delays = RetryDelays::new(Backoff::Constant, Duration::from_millis(100), false);

        let v: Vec<_> = delays.iter().take(4).collect();
        assert_eq!(v, vec![Duration::from_millis(100); 4]);
    }

    #[test]
    fn exponential_doubles_each_attempt() {
        let delays = RetryDelays::new(Backoff::Exponential, Duration::from_millis(100), false);

        let v: Vec<_> = delays.iter().take(4).collect();
        assert_eq!(
            v,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn zero_interval_yields_zero_delays() {
        let delays = RetryDelays::new(Backoff::Exponential, Duration::ZERO, true);

        assert!(delays.iter().take(5).all(|d| d.is_zero()));
    }

    #[test]
    fn jitter_stays_within_the_spread() {
        let interval = Duration::from_millis(1000);
        let delays = RetryDelays::new(Backoff::Constant, interval, true);

        for delay in delays.iter().take(100) {
            assert!(delay >= Duration::from_millis(750), "delay {delay:?} below jitter floor");
            assert!(delay <= Duration::from_millis(1250), "delay {delay:?} above jitter ceiling");
        }
    }

    #[test]
    fn exponential_saturates_instead_of_overflowing() {
        let delays = RetryDelays::new(Backoff::Exponential, Duration::from_secs(86_400), false);

        // Far past any realistic attempt count the multiplier saturates.
        let huge = delays.iter().nth(200).expect("iterator is infinite");
        assert!(huge >= Duration::from_secs(86_400));
    }

    #[test]
    fn each_iterator_starts_from_the_first_attempt() {
        let delays = RetryDelays::new(Backoff::Exponential, Duration::from_millis(100), false);

        let first_pass: Vec<_> = delays.iter().take(2).collect();
        let second_pass: Vec<_> = delays.iter().take(2).collect();

        assert_eq!(first_pass, second_pass);
    }
}
