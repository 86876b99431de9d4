//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciliations. The sequence grows more slowly
//! than exponential backoff: with a 5s minimum it runs 5s, 5s, 10s, 15s, 25s,
//! 40s, ... up to the configured maximum.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_secs: u64,
    /// Previous backoff value in seconds
    prev_secs: u64,
    /// Current backoff value in seconds
    current_secs: u64,
    /// Maximum backoff value in seconds
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff
    ///
    /// # Arguments
    ///
    /// * `min_secs` - Minimum backoff (used for the first two values)
    /// * `max_secs` - Maximum backoff (caps the sequence)
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs.min(max_secs),
            max_secs,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;
        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next, self.max_secs);
        result
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs.min(self.max_secs);
    }
}

/// Backoff state per watched object (keyed by `namespace/name`)
#[derive(Debug)]
pub struct BackoffRegistry {
    min_secs: u64,
    max_secs: u64,
    states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl BackoffRegistry {
    /// Registry handing out sequences bounded by `min_secs` and `max_secs`.
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            max_secs,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before retrying `key`; advances that key's sequence.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .entry(key.to_string())
            .or_insert_with(|| FibonacciBackoff::new(self.min_secs, self.max_secs))
            .next_backoff()
    }

    /// Forget `key`'s failures after a successful cycle.
    pub fn reset(&self, key: &str) {
        if let Some(backoff) = self.states.lock().unwrap_or_else(PoisonError::into_inner).get_mut(key) {
            backoff.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(5, 300);

        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 15);
        assert_eq!(backoff.next_backoff_seconds(), 25);
        assert_eq!(backoff.next_backoff_seconds(), 40);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(5, 20);

        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 15);
        // Next would be 25s, capped at 20s
        assert_eq!(backoff.next_backoff_seconds(), 20);
        assert_eq!(backoff.next_backoff_seconds(), 20);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(5, 300);

        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 10);

        backoff.reset();

        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 5);
        assert_eq!(backoff.next_backoff_seconds(), 10);
    }

    #[test]
    fn test_registry_tracks_keys_independently() {
        let registry = BackoffRegistry::new(5, 300);

        assert_eq!(registry.next_delay("nsx-system-operator/nsx-ncp-operator-config"), Duration::from_secs(5));
        assert_eq!(registry.next_delay("nsx-system-operator/nsx-ncp-operator-config"), Duration::from_secs(5));
        assert_eq!(registry.next_delay("nsx-system-operator/nsx-ncp-operator-config"), Duration::from_secs(10));
        assert_eq!(registry.next_delay("/cluster"), Duration::from_secs(5));

        registry.reset("nsx-system-operator/nsx-ncp-operator-config");
        assert_eq!(registry.next_delay("nsx-system-operator/nsx-ncp-operator-config"), Duration::from_secs(5));
    }
}
