//! Prometheus text-exposition metrics, served from the side-car listener.
//!
//! Namespace is `isame_lb_*`. The collector holds its own counters rather
//! than wrapping a third-party registry — the metric set is small and
//! fixed, and hand-rolled exposition keeps the dependency list unchanged
//! from the teacher's.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct RequestKey {
    upstream: String,
    backend: String,
    method: String,
    status: u16,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct DurationKey {
    upstream: String,
    backend: String,
    method: String,
}

#[derive(Default)]
struct DurationAgg {
    count: u64,
    sum_seconds: f64,
}

#[derive(Default)]
pub struct MetricsCollector {
    requests_total: RwLock<HashMap<RequestKey, u64>>,
    request_duration: RwLock<HashMap<DurationKey, DurationAgg>>,
    upstream_healthy: RwLock<HashMap<(String, String), bool>>,
    active_connections: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, upstream: &str, backend: &str, method: &str, status: u16, duration_seconds: f64) {
        {
            let mut totals = self.requests_total.write().unwrap();
            *totals
                .entry(RequestKey {
                    upstream: upstream.to_string(),
                    backend: backend.to_string(),
                    method: method.to_string(),
                    status,
                })
                .or_insert(0) += 1;
        }
        {
            let mut durations = self.request_duration.write().unwrap();
            let agg = durations
                .entry(DurationKey {
                    upstream: upstream.to_string(),
                    backend: backend.to_string(),
                    method: method.to_string(),
                })
                .or_default();
            agg.count += 1;
            agg.sum_seconds += duration_seconds;
        }
    }

    pub fn set_backend_health(&self, upstream: &str, backend: &str, healthy: bool) {
        self.upstream_healthy
            .write()
            .unwrap()
            .insert((upstream.to_string(), backend.to_string()), healthy);
    }

    pub fn increment_active_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        self.active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)))
            .ok();
    }

    /// Renders the Prometheus text-exposition format (version 0.0.4).
    pub fn render(&self) -> String {
        let mut out = String::new();

        writeln!(out, "# HELP isame_lb_requests_total Total requests forwarded to a backend.").ok();
        writeln!(out, "# TYPE isame_lb_requests_total counter").ok();
        let totals = self.requests_total.read().unwrap();
        for (key, count) in totals.iter() {
            writeln!(
                out,
                "isame_lb_requests_total{{upstream=\"{}\",backend=\"{}\",method=\"{}\",status=\"{}\"}} {}",
                key.upstream, key.backend, key.method, key.status, count
            )
            .ok();
        }

        writeln!(out, "# HELP isame_lb_request_duration_seconds Backend response latency.").ok();
        writeln!(out, "# TYPE isame_lb_request_duration_seconds summary").ok();
        let durations = self.request_duration.read().unwrap();
        for (key, agg) in durations.iter() {
            writeln!(
                out,
                "isame_lb_request_duration_seconds_sum{{upstream=\"{}\",backend=\"{}\",method=\"{}\"}} {}",
                key.upstream, key.backend, key.method, agg.sum_seconds
            )
            .ok();
            writeln!(
                out,
                "isame_lb_request_duration_seconds_count{{upstream=\"{}\",backend=\"{}\",method=\"{}\"}} {}",
                key.upstream, key.backend, key.method, agg.count
            )
            .ok();
        }

        writeln!(out, "# HELP isame_lb_upstream_healthy 1 if the backend is currently healthy.").ok();
        writeln!(out, "# TYPE isame_lb_upstream_healthy gauge").ok();
        let health = self.upstream_healthy.read().unwrap();
        for ((upstream, backend), healthy) in health.iter() {
            writeln!(
                out,
                "isame_lb_upstream_healthy{{upstream=\"{}\",backend=\"{}\"}} {}",
                upstream,
                backend,
                if *healthy { 1 } else { 0 }
            )
            .ok();
        }

        writeln!(out, "# HELP isame_lb_active_connections In-flight proxied connections.").ok();
        writeln!(out, "# TYPE isame_lb_active_connections gauge").ok();
        writeln!(
            out,
            "isame_lb_active_connections {}",
            self.active_connections.load(Ordering::Relaxed)
        )
        .ok();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_recorded_request() {
        let m = MetricsCollector::new();
        m.record_request("api", "http://a", "GET", 200, 0.05);
        let text = m.render();
        assert!(text.contains("isame_lb_requests_total{upstream=\"api\",backend=\"http://a\",method=\"GET\",status=\"200\"} 1"));
    }

    #[test]
    fn duration_accumulates_across_requests() {
        let m = MetricsCollector::new();
        m.record_request("api", "http://a", "GET", 200, 0.1);
        m.record_request("api", "http://a", "GET", 200, 0.2);
        let text = m.render();
        assert!(text.contains("isame_lb_request_duration_seconds_count{upstream=\"api\",backend=\"http://a\",method=\"GET\"} 2"));
        assert!(text.contains("isame_lb_request_duration_seconds_sum{upstream=\"api\",backend=\"http://a\",method=\"GET\"}"));
    }

    #[test]
    fn active_connections_tracks_increment_and_decrement() {
        let m = MetricsCollector::new();
        m.increment_active_connections();
        m.increment_active_connections();
        m.decrement_active_connections();
        let text = m.render();
        assert!(text.contains("isame_lb_active_connections 1"));
    }

    #[test]
    fn backend_health_reflected_in_output() {
        let m = MetricsCollector::new();
        m.set_backend_health("api", "http://a", false);
        let text = m.render();
        assert!(text.contains("isame_lb_upstream_healthy{upstream=\"api\",backend=\"http://a\"} 0"));
    }
}
