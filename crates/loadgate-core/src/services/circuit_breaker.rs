//! Per-backend circuit breaker.
//!
//! Deliberately a two-state machine (`Closed`/`Open`), not the three-state
//! `Closed`/`Open`/`HalfOpen` machine used elsewhere in this lineage: the
//! first post-timeout attempt IS the probe. If it succeeds, `record_success`
//! already closes the breaker; if it fails, `record_failure` re-opens it
//! (immediately, if `failure_threshold` is 1). No separate half-open state
//! is needed to express that.

use log::warn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Entry {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_time: Option<Instant>,
}

impl Entry {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_time: None,
        }
    }
}

/// Per-backend circuit breaker, keyed by backend URL.
///
/// Unknown URLs answer `can_attempt=true`, state `Closed` — an entry is
/// created lazily on first use rather than requiring upfront registration.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    entries: RwLock<HashMap<String, Mutex<Entry>>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Returns true if a request against `url` may proceed.
    pub fn can_attempt(&self, url: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        // Fast path: entry already exists.
        {
            let map = self.entries.read().unwrap();
            if let Some(entry) = map.get(url) {
                return self.check_and_maybe_recover(entry);
            }
        }

        // Slow path: create the entry.
        let mut map = self.entries.write().unwrap();
        let entry = map.entry(url.to_string()).or_insert_with(|| Mutex::new(Entry::new()));
        self.check_and_maybe_recover(entry)
    }

    fn check_and_maybe_recover(&self, entry: &Mutex<Entry>) -> bool {
        let mut e = entry.lock().unwrap();
        match e.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = e
                    .last_failure_time
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.timeout {
                    e.state = CircuitState::Closed;
                    e.consecutive_failures = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, url: &str) {
        if !self.config.enabled {
            return;
        }
        let map = self.entries.read().unwrap();
        if let Some(entry) = map.get(url) {
            let mut e = entry.lock().unwrap();
            e.consecutive_failures = 0;
            e.state = CircuitState::Closed;
        }
        // No entry yet means the backend has never failed; nothing to reset.
    }

    pub fn record_failure(&self, url: &str) {
        if !self.config.enabled {
            return;
        }
        {
            let map = self.entries.read().unwrap();
            if let Some(entry) = map.get(url) {
                self.apply_failure(entry);
                return;
            }
        }
        let mut map = self.entries.write().unwrap();
        let entry = map.entry(url.to_string()).or_insert_with(|| Mutex::new(Entry::new()));
        self.apply_failure(entry);
    }

    fn apply_failure(&self, entry: &Mutex<Entry>) {
        let mut e = entry.lock().unwrap();
        e.consecutive_failures += 1;
        e.last_failure_time = Some(Instant::now());
        if e.consecutive_failures >= self.config.failure_threshold && e.state == CircuitState::Closed {
            e.state = CircuitState::Open;
            warn!(
                "circuit breaker opened for backend after {} consecutive failures",
                e.consecutive_failures
            );
        }
    }

    #[cfg(test)]
    fn state_of(&self, url: &str) -> CircuitState {
        let map = self.entries.read().unwrap();
        map.get(url)
            .map(|e| e.lock().unwrap().state)
            .unwrap_or(CircuitState::Closed)
    }
}
