//! Active health checking: one periodic prober task per backend.
//!
//! Grounded in the same "spawn a task, share state through an `Arc`, stop
//! via an atomic flag" shape used for background work elsewhere in this
//! lineage, but the probe itself, the per-backend state machine, and the
//! read surface (`is_healthy`/`snapshot`) are new to match the spec: a
//! backend starts `Healthy`, flips to `Unhealthy` after
//! `unhealthy_threshold` consecutive failed probes, and flips back after
//! `healthy_threshold` consecutive successful ones.

use log::{debug, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub path: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(2),
            healthy_threshold: 2,
            unhealthy_threshold: 3,
        }
    }
}

#[derive(Debug)]
struct BackendHealth {
    status: HealthStatus,
    consecutive_successes: u32,
    consecutive_failures: u32,
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self {
            status: HealthStatus::Healthy,
            consecutive_successes: 0,
            consecutive_failures: 0,
        }
    }
}

/// Owns one prober task per backend URL and the shared status map they
/// write into. Cloning this struct (via `Arc`) is how the dispatcher reads
/// the current snapshot without blocking on the probe loop.
pub struct HealthChecker {
    config: HealthCheckConfig,
    client: Client,
    statuses: RwLock<HashMap<String, BackendHealth>>,
    running: AtomicBool,
}

impl HealthChecker {
    pub fn new(config: HealthCheckConfig) -> Arc<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Arc::new(Self {
            config,
            client,
            statuses: RwLock::new(HashMap::new()),
            running: AtomicBool::new(true),
        })
    }

    /// Spawns one prober task per backend URL. Returns their join handles
    /// so the caller can await clean shutdown after calling `stop`.
    pub fn start(self: &Arc<Self>, backend_urls: Vec<String>) -> Vec<JoinHandle<()>> {
        {
            let mut statuses = self.statuses.write().unwrap();
            for url in &backend_urls {
                statuses.entry(url.clone()).or_default();
            }
        }

        if !self.config.enabled {
            return Vec::new();
        }

        backend_urls
            .into_iter()
            .map(|url| {
                let checker = Arc::clone(self);
                tokio::spawn(async move { checker.probe_loop(url).await })
            })
            .collect()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn probe_loop(&self, url: String) {
        let mut ticker = tokio::time::interval(self.config.interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            let ok = self.probe_once(&url).await;
            self.record(&url, ok);
        }
    }

    async fn probe_once(&self, url: &str) -> bool {
        let target = format!("{}{}", url.trim_end_matches('/'), self.config.path);
        match self.client.get(&target).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                debug!("health probe for {} failed: {}", url, err);
                false
            }
        }
    }

    fn record(&self, url: &str, ok: bool) {
        let mut statuses = self.statuses.write().unwrap();
        let entry = statuses.entry(url.to_string()).or_default();

        if ok {
            entry.consecutive_successes += 1;
            entry.consecutive_failures = 0;
            if entry.status == HealthStatus::Unhealthy
                && entry.consecutive_successes >= self.config.healthy_threshold
            {
                entry.status = HealthStatus::Healthy;
                debug!("backend {} marked healthy", url);
            }
        } else {
            entry.consecutive_failures += 1;
            entry.consecutive_successes = 0;
            if entry.status == HealthStatus::Healthy
                && entry.consecutive_failures >= self.config.unhealthy_threshold
            {
                entry.status = HealthStatus::Unhealthy;
                warn!("backend {} marked unhealthy", url);
            }
        }
    }

    pub fn is_healthy(&self, url: &str) -> bool {
        self.statuses
            .read()
            .unwrap()
            .get(url)
            .map(|h| h.status == HealthStatus::Healthy)
            .unwrap_or(true)
    }

    /// A URL -> healthy snapshot for the balancer to filter against.
    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.statuses
            .read()
            .unwrap()
            .iter()
            .map(|(url, h)| (url.clone(), h.status == HealthStatus::Healthy))
            .collect()
    }

    #[cfg(test)]
    fn force_record(&self, url: &str, ok: bool) {
        self.record(url, ok);
    }
}
