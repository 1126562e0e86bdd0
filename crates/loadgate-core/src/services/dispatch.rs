//! The dispatch pipeline: the single path every proxied request travels.
//!
//! Order per attempt: rate limiter (once per request, not per attempt) ->
//! health snapshot -> balancer pick -> circuit breaker gate -> forward via
//! `reqwest` -> record outcome against the circuit breaker and metrics.
//! The whole pick-and-forward sequence is wrapped by `services::retry`.
//!
//! Lock ordering when a single attempt needs more than one lock: rate
//! limiter, then health, then circuit breaker, then balancer state. No
//! lock is ever held across an `.await` point; every lock acquired above
//! is released before the `reqwest` call.

use crate::models::error::GatewayError;
use crate::models::upstream::Upstream;
use crate::services::balancer::{BalancingPolicy, ConnectionGuard};
use crate::services::circuit_breaker::CircuitBreaker;
use crate::services::health::HealthChecker;
use crate::services::metrics::MetricsCollector;
use crate::services::rate_limit::RateLimiter;
use crate::services::retry::{do_with_retry, RetryConfig};
use reqwest::{Client, Method};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Everything one upstream needs to dispatch a request: its config plus
/// the per-upstream service instances the pipeline threads through.
pub struct UpstreamPipeline {
    pub upstream: Upstream,
    pub client: Client,
    pub balancer: BalancingPolicy,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub health_checker: Arc<HealthChecker>,
    pub rate_limiter: Arc<RateLimiter>,
    pub retry_config: RetryConfig,
    pub metrics: Arc<MetricsCollector>,
}

pub struct ProxiedResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: bytes::Bytes,
    pub backend_url: String,
}

impl UpstreamPipeline {
    /// Runs the full pipeline for one inbound request. `headers_written` is
    /// owned by the caller and observed here only to decide whether a
    /// transport failure after partial response bytes were already
    /// streamed back to the client is still worth retrying — loadgate
    /// buffers the body before writing headers, so this is always false in
    /// practice, but the latch keeps the invariant explicit and testable.
    pub async fn dispatch(
        &self,
        client_id: &str,
        method: Method,
        path_and_query: &str,
        headers: reqwest::header::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<ProxiedResponse, GatewayError> {
        if self.upstream.backends.is_empty() {
            return Err(GatewayError::NoUpstreamConfigured);
        }

        if !self.rate_limiter.allow(client_id) {
            return Err(GatewayError::RateLimited);
        }

        let headers_written = AtomicBool::new(false);

        do_with_retry(
            &self.retry_config,
            |err: &GatewayError| err.is_retryable() && !headers_written.load(Ordering::SeqCst),
            |_attempt| {
                self.attempt_once(method.clone(), path_and_query, headers.clone(), body.clone())
            },
        )
        .await
    }

    async fn attempt_once(
        &self,
        method: Method,
        path_and_query: &str,
        headers: reqwest::header::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<ProxiedResponse, GatewayError> {
        let snapshot = self.health_checker.snapshot();
        let backend = self
            .balancer
            .select_backend(&self.upstream.backends, &snapshot)
            .map_err(|_| GatewayError::NoHealthyBackends)?;

        if !self.circuit_breaker.can_attempt(&backend.url) {
            return Err(GatewayError::CircuitOpen(backend.url.clone()));
        }

        let _conn_guard = self
            .balancer
            .connection_tracker()
            .map(|tracker| ConnectionGuard::acquire(tracker, &backend.url));

        let target = format!("{}{}", backend.url.trim_end_matches('/'), path_and_query);
        let started = Instant::now();

        let result = self
            .client
            .request(method.clone(), &target)
            .headers(headers)
            .body(body)
            .send()
            .await;

        let outcome = match result {
            Ok(resp) => {
                let status = resp.status();
                if status.is_server_error() {
                    self.circuit_breaker.record_failure(&backend.url);
                    Err(GatewayError::BackendServerError(status.as_u16()))
                } else {
                    // 4xx is a successful dispatch from the pipeline's point of view: the
                    // backend answered, so the response is forwarded verbatim rather than
                    // retried or replaced with a synthetic error body.
                    self.circuit_breaker.record_success(&backend.url);
                    let response_headers = resp.headers().clone();
                    let response_body = resp.bytes().await.map_err(|e| {
                        GatewayError::BackendTransportError(e.to_string())
                    })?;
                    Ok(ProxiedResponse {
                        status: status.as_u16(),
                        headers: response_headers,
                        body: response_body,
                        backend_url: backend.url.clone(),
                    })
                }
            }
            Err(err) => {
                self.circuit_breaker.record_failure(&backend.url);
                Err(GatewayError::BackendTransportError(err.to_string()))
            }
        };

        let status_for_metrics = match &outcome {
            Ok(resp) => resp.status,
            Err(GatewayError::BackendServerError(code)) => *code,
            Err(_) => 0,
        };
        self.metrics.record_request(
            &self.upstream.name,
            &backend.url,
            method.as_str(),
            status_for_metrics,
            started.elapsed().as_secs_f64(),
        );

        outcome
    }
}
