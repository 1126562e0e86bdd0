//! Semantic configuration validation, layered on top of serde's
//! structural checks.
//!
//! Mirrors the teacher's three-tier `ValidationResult` (errors abort
//! startup, warnings and recommendations are logged and non-fatal) but the
//! checks themselves are specific to a reverse-proxy config rather than a
//! route table.

use super::settings::Settings;
use log::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_recommendation(&mut self, recommendation: String) {
        self.recommendations.push(recommendation);
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_comprehensive(settings: &Settings) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_basic_structure(settings, &mut result);
        Self::validate_retry_and_breaker(settings, &mut result);
        Self::validate_tls(settings, &mut result);
        Self::validate_health_and_scale(settings, &mut result);

        Self::log_validation_results(&result);
        result
    }

    fn validate_basic_structure(settings: &Settings, result: &mut ValidationResult) {
        if settings.upstreams.is_empty() {
            result.add_warning(
                "no upstreams configured - every proxied request will fail with NoUpstreamConfigured"
                    .to_string(),
            );
        }

        for upstream in &settings.upstreams {
            if let Err(error) = upstream.validate() {
                result.add_error(error);
            }
        }
    }

    fn validate_retry_and_breaker(settings: &Settings, result: &mut ValidationResult) {
        let retry = &settings.retry;
        if retry.initial_backoff > retry.max_backoff {
            result.add_error(format!(
                "retry.initial_backoff ({}) must be <= retry.max_backoff ({})",
                retry.initial_backoff, retry.max_backoff
            ));
        }
        if retry.enabled && retry.max_attempts == 0 {
            result.add_error("retry.max_attempts must be >= 1 when retry is enabled".to_string());
        }

        let breaker = &settings.circuit_breaker;
        if breaker.enabled && breaker.failure_threshold == 0 {
            result.add_error("circuit_breaker.failure_threshold must be >= 1".to_string());
        }
    }

    fn validate_tls(settings: &Settings, result: &mut ValidationResult) {
        let tls = &settings.tls;
        if tls.enabled {
            let cert_present = tls.cert_file.as_deref().is_some_and(|s| !s.is_empty());
            let key_present = tls.key_file.as_deref().is_some_and(|s| !s.is_empty());
            if !cert_present || !key_present {
                result.add_error(
                    "tls.enabled requires both tls.cert_file and tls.key_file".to_string(),
                );
            }
        }
    }

    fn validate_health_and_scale(settings: &Settings, result: &mut ValidationResult) {
        if settings.health.unhealthy_threshold == 0 || settings.health.healthy_threshold == 0 {
            result.add_error(
                "health.unhealthy_threshold and health.healthy_threshold must be >= 1".to_string(),
            );
        }

        for upstream in &settings.upstreams {
            if !settings.health.enabled && upstream.backends.len() > 1 {
                result.add_recommendation(format!(
                    "upstream '{}' has {} backends but health checks are disabled - \
                     unhealthy backends will not be skipped",
                    upstream.name,
                    upstream.backends.len()
                ));
            }
        }

        if settings.metrics.port == settings.server.port {
            result.add_error(
                "metrics.port must differ from server.port - both listeners cannot bind the same port"
                    .to_string(),
            );
        }
    }

    fn log_validation_results(result: &ValidationResult) {
        for error in &result.errors {
            warn!("config error: {}", error);
        }
        for warning in &result.warnings {
            warn!("config warning: {}", warning);
        }
        for recommendation in &result.recommendations {
            info!("config recommendation: {}", recommendation);
        }
    }
}
