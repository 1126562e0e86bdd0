//! Backend and upstream data model.
//!
//! An [`Upstream`] is a named group of [`Backend`] targets sharing one
//! [`BalancingAlgorithm`] and an optional rate-limit policy. Backends and
//! upstreams are immutable after startup; only the health, breaker, policy,
//! and rate-limiter state that reference them by URL ever change.

use serde::{Deserialize, Serialize};

fn default_weight() -> u32 {
    1
}

/// A single addressable HTTP(S) target. The `url` is the stable identity
/// key used by the health checker, circuit breaker, and policy state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backend {
    /// Full target URL, e.g. `http://10.0.0.1:9000`.
    pub url: String,

    /// Relative weight for weighted load balancing (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Backend {
    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(format!(
                "backend url must start with http:// or https://: {}",
                self.url
            ));
        }
        if self.weight == 0 {
            return Err(format!("backend weight must be > 0: {}", self.url));
        }
        Ok(())
    }
}

/// Selection algorithm an upstream is balanced with. Closed set — see
/// `BalancingPolicy` in `services::balancer` for the runtime counterpart.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BalancingAlgorithm {
    RoundRobin,
    WeightedRoundRobin,
    LeastConnections,
}

impl Default for BalancingAlgorithm {
    fn default() -> Self {
        Self::RoundRobin
    }
}

/// Per-upstream sliding-window rate limit configuration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    pub requests_per_ip: u32,
    /// Window size in whole seconds.
    pub window_size: u64,
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.requests_per_ip == 0 {
            return Err("rate_limit.requests_per_ip must be > 0 when enabled".to_string());
        }
        if self.enabled && self.window_size == 0 {
            return Err("rate_limit.window_size must be > 0 when enabled".to_string());
        }
        Ok(())
    }
}

/// A named group of backends sharing one balancing policy.
///
/// Invariant: an upstream has at least one backend and exactly one
/// algorithm; enforced by [`Upstream::validate`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Upstream {
    pub name: String,

    #[serde(default)]
    pub algorithm: BalancingAlgorithm,

    pub backends: Vec<Backend>,

    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Upstream {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("upstream name must not be empty".to_string());
        }
        if self.backends.is_empty() {
            return Err(format!("upstream '{}' must have at least one backend", self.name));
        }
        for backend in &self.backends {
            backend
                .validate()
                .map_err(|e| format!("upstream '{}': {}", self.name, e))?;
        }
        if let Some(rl) = &self.rate_limit {
            rl.validate()
                .map_err(|e| format!("upstream '{}': {}", self.name, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_rejects_missing_scheme() {
        let b = Backend { url: "10.0.0.1:9000".to_string(), weight: 1 };
        assert!(b.validate().is_err());
    }

    #[test]
    fn backend_rejects_zero_weight() {
        let b = Backend { url: "http://10.0.0.1:9000".to_string(), weight: 0 };
        assert!(b.validate().is_err());
    }

    #[test]
    fn upstream_requires_at_least_one_backend() {
        let u = Upstream {
            name: "api".to_string(),
            algorithm: BalancingAlgorithm::RoundRobin,
            backends: vec![],
            rate_limit: None,
        };
        assert!(u.validate().is_err());
    }

    #[test]
    fn backend_default_weight_is_one() {
        let b: Backend = serde_json::from_str(r#"{"url":"http://x:1"}"#).unwrap();
        assert_eq!(b.weight, 1);
    }
}
