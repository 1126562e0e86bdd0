//! End-to-end acceptance scenarios exercising the public service API
//! directly, without an HTTP harness.

use loadgate_core::models::upstream::{Backend, BalancingAlgorithm};
use loadgate_core::services::balancer::BalancingPolicy;
use loadgate_core::services::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use loadgate_core::services::rate_limit::{RateLimiter, RateLimiterConfig};
use loadgate_core::services::retry::{do_with_retry, RetryConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

fn backend(url: &str, weight: u32) -> Backend {
    Backend { url: url.to_string(), weight }
}

#[test]
fn even_round_robin_over_three_backends() {
    let backends = vec![backend("a", 1), backend("b", 1), backend("c", 1)];
    let health: HashMap<String, bool> = backends.iter().map(|b| (b.url.clone(), true)).collect();
    let policy = BalancingPolicy::new(BalancingAlgorithm::RoundRobin);

    let mut counts: HashMap<String, u32> = HashMap::new();
    for _ in 0..9 {
        let chosen = policy.select_backend(&backends, &health).unwrap();
        *counts.entry(chosen.url).or_insert(0) += 1;
    }

    assert_eq!(counts["a"], 3);
    assert_eq!(counts["b"], 3);
    assert_eq!(counts["c"], 3);
}

#[test]
fn weighted_smoothness_matches_targets_and_bounds_early_runs() {
    let backends = vec![backend("a", 3), backend("b", 2), backend("c", 1)];
    let health: HashMap<String, bool> = backends.iter().map(|b| (b.url.clone(), true)).collect();
    let policy = BalancingPolicy::new(BalancingAlgorithm::WeightedRoundRobin);

    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut max_a_run_in_first_seven = 0u32;
    let mut current_a_run = 0u32;
    for i in 0..60 {
        let chosen = policy.select_backend(&backends, &health).unwrap();
        *counts.entry(chosen.url.clone()).or_insert(0) += 1;
        if chosen.url == "a" {
            current_a_run += 1;
        } else {
            current_a_run = 0;
        }
        if i < 7 {
            max_a_run_in_first_seven = max_a_run_in_first_seven.max(current_a_run);
        }
    }

    assert_eq!(counts["a"], 30);
    assert_eq!(counts["b"], 20);
    assert_eq!(counts["c"], 10);
    assert!(max_a_run_in_first_seven <= 2);
}

#[test]
fn health_aware_skip_over_six_calls() {
    let backends = vec![backend("a", 1), backend("b", 1), backend("c", 1)];
    let mut health: HashMap<String, bool> = backends.iter().map(|b| (b.url.clone(), true)).collect();
    health.insert("b".to_string(), false);
    let policy = BalancingPolicy::new(BalancingAlgorithm::RoundRobin);

    let mut counts: HashMap<String, u32> = HashMap::new();
    for _ in 0..6 {
        let chosen = policy.select_backend(&backends, &health).unwrap();
        *counts.entry(chosen.url).or_insert(0) += 1;
    }

    assert_eq!(counts.get("b"), None);
    assert_eq!(counts["a"], 3);
    assert_eq!(counts["c"], 3);
}

#[test]
fn breaker_trips_and_recovers_after_timeout() {
    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 3,
        timeout: Duration::from_millis(100),
    });

    breaker.record_failure("http://x");
    breaker.record_failure("http://x");
    breaker.record_failure("http://x");
    assert!(!breaker.can_attempt("http://x"));

    std::thread::sleep(Duration::from_millis(120));
    assert!(breaker.can_attempt("http://x"));

    // A fresh failure now only counts as one against the reset counter.
    breaker.record_failure("http://x");
    assert!(breaker.can_attempt("http://x"));
}

#[test]
fn sliding_window_rejects_then_reopens_after_window_elapses() {
    let limiter = RateLimiter::new(RateLimiterConfig {
        enabled: true,
        requests_per_ip: 3,
        window: Duration::from_millis(500),
    });

    let t0 = Instant::now();
    // Exercise the public `allow` path with real elapsed time rather than the
    // private `allow_at` helper the unit tests use.
    assert!(limiter.allow("client"));
    assert!(limiter.allow("client"));
    assert!(limiter.allow("client"));
    assert!(!limiter.allow("client"));
    assert!(t0.elapsed() < Duration::from_millis(500));

    std::thread::sleep(Duration::from_millis(600));
    assert!(limiter.allow("client"));
}

#[tokio::test]
async fn retry_then_succeed_after_two_failures() {
    let config = RetryConfig {
        enabled: true,
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(100),
    };
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    let result: Result<&str, &str> = do_with_retry(
        &config,
        |_: &&str| true,
        |_attempt| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient")
                } else {
                    Ok("ok")
                }
            }
        },
    )
    .await;

    assert_eq!(result, Ok("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(10));
}
