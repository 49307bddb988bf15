// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-cached health probe result, so repeated pool acquisitions don't each
//! pay for a fresh probe (spec §4.3: "lazy health check before reuse").

use orch_core::Clock;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

struct Cached {
    healthy: bool,
    checked_at: Instant,
}

pub struct HealthCache {
    ttl: Duration,
    cached: Mutex<Option<Cached>>,
}

impl HealthCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, cached: Mutex::new(None) }
    }

    /// Return a cached verdict if it's still within `ttl`, else `None` to
    /// indicate a fresh probe is needed.
    pub fn get(&self, clock: &impl Clock) -> Option<bool> {
        let cached = self.cached.lock();
        cached.as_ref().and_then(|c| (clock.now().duration_since(c.checked_at) < self.ttl).then_some(c.healthy))
    }

    pub fn record(&self, healthy: bool, clock: &impl Clock) {
        *self.cached.lock() = Some(Cached { healthy, checked_at: clock.now() });
    }
}
