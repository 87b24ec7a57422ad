// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async token bucket with lazy refill.
//!
//! The bucket starts full. Tokens are recomputed from elapsed monotonic time
//! on every acquisition, under the same lock as the consume step, and never
//! exceed capacity. Callers that find the bucket empty sleep for exactly the
//! time needed to refill the missing fraction and try again.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    /// Tokens per second.
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Bucket holding `capacity` tokens, refilled at `refill_rate` tokens/second.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_rate: refill_rate.max(f64::MIN_POSITIVE),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Bucket sized to `safety_margin` of an advertised `requests`-per-`period` limit.
    ///
    /// Capacity is `max(1, round(requests * safety_margin))`, refilled evenly
    /// over `period`.
    pub fn for_limit(requests: u32, period: Duration, safety_margin: f64) -> Self {
        let capacity = (f64::from(requests) * safety_margin).round().max(1.0) as u32;
        let period = period.as_secs_f64().max(f64::EPSILON);
        Self::new(capacity, f64::from(capacity) / period)
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }

    /// Time until `needed` tokens are available, zero if they already are.
    fn wait_time(&self, tokens: f64, needed: f64) -> Duration {
        Duration::from_secs_f64((needed - tokens).max(0.0) / self.refill_rate)
    }

    /// Take one token, waiting if necessary. Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state, Instant::now());
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return started.elapsed();
                }
                self.wait_time(state.tokens, 1.0)
            };
            trace!(wait_ms = wait.as_millis() as u64, "token bucket empty, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Take one token if available right now.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available (after refill).
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());
        state.tokens
    }
}
