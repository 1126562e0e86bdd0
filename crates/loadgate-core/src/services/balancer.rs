//! Backend selection policies.
//!
//! Expressed as a sealed enum, not a `dyn Trait` hierarchy: the policy set
//! is closed (exactly the three algorithms named by
//! [`crate::models::upstream::BalancingAlgorithm`]), so there is no need
//! for open extensibility via trait objects. Each variant carries its own
//! interior state.

use crate::models::upstream::{Backend, BalancingAlgorithm};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no healthy backends available")]
pub struct NoHealthyBackends;

/// Tracks in-flight connection counts for the least-connections policy.
/// Exposed separately from `BalancingPolicy::select_backend` so the
/// dispatcher can acquire an RAII guard around a single attempt.
#[derive(Debug, Default)]
pub struct ConnectionCounts {
    counts: Mutex<HashMap<String, AtomicU64>>,
}

impl ConnectionCounts {
    fn get(&self, url: &str) -> u64 {
        let counts = self.counts.lock().unwrap();
        counts.get(url).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn increment(&self, url: &str) {
        let mut counts = self.counts.lock().unwrap();
        counts
            .entry(url.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self, url: &str) {
        let counts = self.counts.lock().unwrap();
        if let Some(c) = counts.get(url) {
            c.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)))
                .ok();
        }
    }
}

/// RAII guard that decrements a least-connections counter on drop,
/// guaranteeing the decrement happens on every exit path from an attempt
/// (including early `?` returns) exactly once.
pub struct ConnectionGuard<'a> {
    counts: &'a ConnectionCounts,
    url: String,
}

impl<'a> ConnectionGuard<'a> {
    pub fn acquire(counts: &'a ConnectionCounts, url: &str) -> Self {
        counts.increment(url);
        Self { counts, url: url.to_string() }
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.counts.decrement(&self.url);
    }
}

/// Selects a healthy backend for one request. `health_snapshot` maps
/// backend URL to healthy/unhealthy; a missing entry is treated as healthy.
pub enum BalancingPolicy {
    RoundRobin(AtomicUsize),
    WeightedSmoothRoundRobin(Mutex<HashMap<String, AtomicI64>>),
    LeastConnections(ConnectionCounts),
}

impl BalancingPolicy {
    pub fn new(algorithm: BalancingAlgorithm) -> Self {
        match algorithm {
            BalancingAlgorithm::RoundRobin => Self::RoundRobin(AtomicUsize::new(0)),
            BalancingAlgorithm::WeightedRoundRobin => {
                Self::WeightedSmoothRoundRobin(Mutex::new(HashMap::new()))
            }
            BalancingAlgorithm::LeastConnections => Self::LeastConnections(ConnectionCounts::default()),
        }
    }

    /// Accessor for the least-connections counter set, used by the
    /// dispatcher to acquire a `ConnectionGuard`. Returns `None` for
    /// policies that don't track connections.
    pub fn connection_tracker(&self) -> Option<&ConnectionCounts> {
        match self {
            Self::LeastConnections(counts) => Some(counts),
            _ => None,
        }
    }

    pub fn select_backend(
        &self,
        backends: &[Backend],
        health_snapshot: &HashMap<String, bool>,
    ) -> Result<Backend, NoHealthyBackends> {
        let healthy: Vec<&Backend> = backends
            .iter()
            .filter(|b| *health_snapshot.get(&b.url).unwrap_or(&true))
            .collect();

        if healthy.is_empty() {
            return Err(NoHealthyBackends);
        }

        match self {
            Self::RoundRobin(counter) => {
                let idx = counter.fetch_add(1, Ordering::Relaxed) % healthy.len();
                Ok(healthy[idx].clone())
            }
            Self::WeightedSmoothRoundRobin(state) => {
                Ok(self.select_weighted(state, &healthy))
            }
            Self::LeastConnections(counts) => {
                let chosen = healthy
                    .iter()
                    .min_by_key(|b| counts.get(&b.url))
                    .expect("healthy is non-empty");
                Ok((*chosen).clone())
            }
        }
    }

    fn select_weighted(
        &self,
        state: &Mutex<HashMap<String, AtomicI64>>,
        healthy: &[&Backend],
    ) -> Backend {
        let mut weights = state.lock().unwrap();
        let total: i64 = healthy.iter().map(|b| b.weight as i64).sum();

        let mut best_url: Option<String> = None;
        let mut best_weight = i64::MIN;

        for backend in healthy {
            let current = weights
                .entry(backend.url.clone())
                .or_insert_with(|| AtomicI64::new(0));
            let updated = current.fetch_add(backend.weight as i64, Ordering::Relaxed) + backend.weight as i64;
            if updated > best_weight {
                best_weight = updated;
                best_url = Some(backend.url.clone());
            }
        }

        let best_url = best_url.expect("healthy is non-empty");
        if let Some(counter) = weights.get(&best_url) {
            counter.fetch_sub(total, Ordering::Relaxed);
        }

        (*healthy
            .iter()
            .find(|b| b.url == best_url)
            .expect("best_url came from healthy"))
        .clone()
    }
}
