//! Gateway error types and their HTTP response mapping.
//!
//! `GatewayError` covers every error kind the dispatch pipeline can
//! surface (§7 of the design): pre-dispatch admission failures, policy
//! failures, circuit-breaker rejections, and backend outcomes. Each
//! variant maps to exactly one HTTP status via `ResponseError`.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("no upstreams configured")]
    NoUpstreamConfigured,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("no healthy backends available")]
    NoHealthyBackends,

    #[error("circuit open for backend {0}")]
    CircuitOpen(String),

    #[error("backend transport error: {0}")]
    BackendTransportError(String),

    #[error("backend returned server error status {0}")]
    BackendServerError(u16),

    /// Not raised by the dispatch pipeline itself: a 4xx backend response is
    /// forwarded as `Ok(ProxiedResponse)` so the original body and headers
    /// reach the caller unchanged. Kept for the HTTP-mapping table and for
    /// callers that want to classify a status after the fact.
    #[error("backend returned client error status {0}")]
    BackendClientError(u16),
}

impl GatewayError {
    /// Whether this error is a candidate for another retry attempt.
    /// `NoHealthyBackends` is deliberately excluded: a fresh attempt
    /// cannot conjure a healthy backend mid-loop.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GatewayError::NoHealthyBackends | GatewayError::BackendClientError(_))
    }
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({ "error": self.to_string() });
        match self {
            GatewayError::NoUpstreamConfigured => {
                HttpResponse::ServiceUnavailable().json(body)
            }
            GatewayError::RateLimited => HttpResponse::TooManyRequests().json(body),
            GatewayError::NoHealthyBackends => HttpResponse::ServiceUnavailable().json(body),
            GatewayError::CircuitOpen(_) => HttpResponse::ServiceUnavailable().json(body),
            GatewayError::BackendTransportError(_) => HttpResponse::ServiceUnavailable().json(body),
            GatewayError::BackendServerError(_) => HttpResponse::ServiceUnavailable().json(body),
            GatewayError::BackendClientError(status) => {
                let code = actix_web::http::StatusCode::from_u16(*status)
                    .unwrap_or(actix_web::http::StatusCode::BAD_REQUEST);
                HttpResponse::build(code).json(body)
            }
        }
    }
}
