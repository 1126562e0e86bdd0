//! Shared application state handed to every route handler via
//! `actix_web::web::Data`.

use crate::config::settings::Settings;
use crate::services::dispatch::UpstreamPipeline;
use crate::services::health::HealthChecker;
use std::sync::Arc;

/// Everything a request handler needs: the dispatch pipeline for the
/// single upstream actually routed to (`upstreams[0]`, see the dispatch
/// pipeline's design note), plus introspection data drawn from the full
/// configured upstream set for `/status`.
pub struct AppState {
    pub pipeline: Option<Arc<UpstreamPipeline>>,
    pub service_name: String,
    pub upstream_count: usize,
    pub backend_urls: Vec<String>,
    pub health_checks_enabled: bool,
    pub metrics_enabled: bool,
    pub health_checker: Arc<HealthChecker>,
}

impl AppState {
    pub fn from_settings(
        settings: &Settings,
        pipeline: Option<Arc<UpstreamPipeline>>,
        health_checker: Arc<HealthChecker>,
    ) -> Self {
        let backend_urls = settings
            .upstreams
            .iter()
            .flat_map(|u| u.backends.iter().map(|b| b.url.clone()))
            .collect();

        Self {
            pipeline,
            service_name: settings.server.service_name.clone(),
            upstream_count: settings.upstreams.len(),
            backend_urls,
            health_checks_enabled: settings.health.enabled,
            metrics_enabled: settings.metrics.enabled,
            health_checker,
        }
    }
}
