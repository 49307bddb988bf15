// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-client circuit breaker (spec §4.4).
//!
//! `closed -> open -> half_open -> closed`. After `threshold` consecutive
//! `unreachable|handshake_failed|timeout` outcomes, the breaker opens for
//! `cooldown`. Once the cooldown elapses, exactly one trial call is let
//! through in `half_open`; success returns to `closed`, failure reopens
//! with the cooldown doubled up to `cap`. `remote_error` never trips it.

use orch_core::Clock;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    current_cooldown: Duration,
    opened_until: Option<Instant>,
    /// True while a half-open trial is in flight; guards the "exactly one
    /// trial" rule against concurrent callers.
    trial_in_flight: bool,
}

/// A guard returned by [`CircuitBreaker::try_acquire`]. Callers must report
/// the outcome back via [`CircuitBreaker::on_success`] /
/// [`CircuitBreaker::on_failure`].
pub struct BreakerPermit {
    is_trial: bool,
}

impl BreakerPermit {
    pub fn is_half_open_trial(&self) -> bool {
        self.is_trial
    }
}

pub struct CircuitBreaker {
    threshold: u32,
    base_cooldown: Duration,
    cap: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, base_cooldown: Duration, cap: Duration) -> Self {
        Self {
            threshold,
            base_cooldown,
            cap,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                current_cooldown: base_cooldown,
                opened_until: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Attempt to acquire permission to make a call. Returns `None` when the
    /// breaker is open and the cooldown has not elapsed (fast-fail, spec
    /// §4.4: "fast-fails ... without opening a connection").
    pub fn try_acquire(&self, clock: &impl Clock) -> Option<BreakerPermit> {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => Some(BreakerPermit { is_trial: false }),
            State::Open => {
                let until = inner.opened_until.unwrap_or_else(|| clock.now());
                if clock.now() >= until {
                    inner.state = State::HalfOpen;
                    inner.trial_in_flight = true;
                    Some(BreakerPermit { is_trial: true })
                } else {
                    None
                }
            }
            State::HalfOpen => {
                if inner.trial_in_flight {
                    None
                } else {
                    inner.trial_in_flight = true;
                    Some(BreakerPermit { is_trial: true })
                }
            }
        }
    }

    pub fn on_success(&self, permit: BreakerPermit) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.current_cooldown = self.base_cooldown;
        inner.opened_until = None;
        inner.state = State::Closed;
        if permit.is_trial {
            inner.trial_in_flight = false;
        }
    }

    pub fn on_failure(&self, permit: BreakerPermit, clock: &impl Clock) {
        let mut inner = self.inner.lock();
        if permit.is_trial {
            inner.trial_in_flight = false;
            inner.current_cooldown = (inner.current_cooldown * 2).min(self.cap);
            inner.opened_until = Some(clock.now() + inner.current_cooldown);
            inner.state = State::Open;
            return;
        }

        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.threshold {
            inner.state = State::Open;
            inner.opened_until = Some(clock.now() + inner.current_cooldown);
        }
    }

    /// An outcome that should not affect the breaker at all (spec §4.4:
    /// `remote_error` doesn't trip it, but also shouldn't reset the closed
    /// counter — the worker is live, just reporting failures).
    pub fn release_without_counting(&self, permit: BreakerPermit) {
        let mut inner = self.inner.lock();
        if permit.is_trial {
            // A remote_error on a half-open trial still proves the worker is
            // reachable and answering: treat it as a trial success.
            inner.trial_in_flight = false;
            inner.consecutive_failures = 0;
            inner.current_cooldown = self.base_cooldown;
            inner.opened_until = None;
            inner.state = State::Closed;
        }
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
