#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Named cooldowns and stopwatches driven by the simulation clock.
//!
//! Nothing in this crate sleeps or reads wall-clock time. Every query receives
//! the current [`SimTime`] from the caller, which keeps replays exact.

use std::{collections::HashMap, time::Duration};

use skirmish_core::SimTime;

/// Maps cooldown keys to the timestamp at which they expire.
///
/// A key absent from the registry is never active.
#[derive(Clone, Debug, Default)]
pub struct CooldownRegistry {
    expiries: HashMap<String, SimTime>,
}

impl CooldownRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `key` so it expires `duration` after `now`, replacing any previous expiry.
    pub fn start_timer(&mut self, key: impl Into<String>, duration: Duration, now: SimTime) {
        let _ = self.expiries.insert(key.into(), now + duration);
    }

    /// Reports whether `key` is armed and has not yet expired.
    #[must_use]
    pub fn is_active(&self, key: &str, now: SimTime) -> bool {
        self.expiries
            .get(key)
            .is_some_and(|expiry| now < *expiry)
    }

    /// Time left until `key` expires; zero when absent or already expired.
    #[must_use]
    pub fn time_remaining(&self, key: &str, now: SimTime) -> Duration {
        self.expiries
            .get(key)
            .map_or(Duration::ZERO, |expiry| expiry.saturating_since(now))
    }

    /// Forgets `key`.
    pub fn clear(&mut self, key: &str) {
        let _ = self.expiries.remove(key);
    }

    /// Forgets every key.
    pub fn clear_all(&mut self) {
        self.expiries.clear();
    }

    /// Number of keys currently stored, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    /// Reports whether no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }
}

/// Measures simulated time elapsed since its last restart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stopwatch {
    started: SimTime,
}

impl Stopwatch {
    /// Creates a stopwatch started at `now`.
    #[must_use]
    pub const fn started_at(now: SimTime) -> Self {
        Self { started: now }
    }

    /// Restarts the stopwatch at `now`.
    pub fn restart(&mut self, now: SimTime) {
        self.started = now;
    }

    /// Timestamp of the last restart.
    #[must_use]
    pub const fn started(&self) -> SimTime {
        self.started
    }

    /// Time elapsed between the last restart and `now`.
    #[must_use]
    pub fn elapsed(&self, now: SimTime) -> Duration {
        now.saturating_since(self.started)
    }
}
