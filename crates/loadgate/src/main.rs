//! loadgate reverse-proxy load balancer: process entry point.
//!
//! Starts two independent `HttpServer`s — a front-door listener that
//! proxies every request to `upstreams[0]`, and a side-car metrics
//! listener — plus the health-checker prober tasks, and waits on either
//! for a clean shutdown or `ctrl_c`.

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use reqwest::Client;
use std::sync::Arc;

use loadgate_core::config::settings::load_settings;
use loadgate_core::config::validation::ConfigValidator;
use loadgate_core::logs::logger::configure_logger;
use loadgate_core::routes::{health, metrics_route, proxy, status};
use loadgate_core::services::balancer::BalancingPolicy;
use loadgate_core::services::circuit_breaker::CircuitBreaker;
use loadgate_core::services::dispatch::UpstreamPipeline;
use loadgate_core::services::health::HealthChecker;
use loadgate_core::services::metrics::MetricsCollector;
use loadgate_core::services::rate_limit::{RateLimiter, RateLimiterConfig};
use loadgate_core::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let settings = load_settings().unwrap_or_else(|e| {
        error!("failed to load configuration: {}", e);
        std::process::exit(1);
    });

    info!("starting loadgate v{}", env!("CARGO_PKG_VERSION"));

    let validation = ConfigValidator::validate_comprehensive(&settings);
    if !validation.is_valid {
        error!("configuration validation failed:");
        for err in &validation.errors {
            error!("  - {}", err);
        }
        std::process::exit(1);
    }
    info!(
        "configuration validated with {} warnings, {} recommendations",
        validation.warnings.len(),
        validation.recommendations.len()
    );

    let health_checker = HealthChecker::new((&settings.health).into());
    let all_backend_urls: Vec<String> = settings
        .upstreams
        .iter()
        .flat_map(|u| u.backends.iter().map(|b| b.url.clone()))
        .collect();
    let prober_handles = health_checker.start(all_backend_urls);

    let metrics = Arc::new(MetricsCollector::new());

    let pipeline = settings.upstreams.first().map(|upstream| {
        let rate_limiter = match &upstream.rate_limit {
            Some(rl) => RateLimiter::new(RateLimiterConfig {
                enabled: rl.enabled,
                requests_per_ip: rl.requests_per_ip,
                window: std::time::Duration::from_secs(rl.window_size),
            }),
            None => RateLimiter::new(RateLimiterConfig::default()),
        };

        Arc::new(UpstreamPipeline {
            balancer: BalancingPolicy::new(upstream.algorithm),
            upstream: upstream.clone(),
            client: Client::new(),
            circuit_breaker: CircuitBreaker::new((&settings.circuit_breaker).into()),
            health_checker: Arc::clone(&health_checker),
            rate_limiter,
            retry_config: (&settings.retry).into(),
            metrics: Arc::clone(&metrics),
        })
    });

    let app_state = web::Data::new(AppState::from_settings(
        &settings,
        pipeline,
        Arc::clone(&health_checker),
    ));

    let front_port = settings.server.port;
    let front_server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .configure(health::configure)
            .configure(status::configure)
            .configure(proxy::configure)
    })
    .bind(("0.0.0.0", front_port))?
    .run();

    info!("front door listening on 0.0.0.0:{}", front_port);

    let metrics_data = web::Data::from(metrics);
    let metrics_enabled = settings.metrics.enabled;
    let metrics_port = settings.metrics.port;
    let metrics_path = settings.metrics.path.clone();

    let result = if metrics_enabled {
        let metrics_server = HttpServer::new(move || {
            App::new()
                .app_data(metrics_data.clone())
                .configure(metrics_route::configure(metrics_path.clone()))
        })
        .bind(("0.0.0.0", metrics_port))?
        .run();

        info!("metrics listening on 0.0.0.0:{}", metrics_port);

        tokio::select! {
            res = front_server => res,
            res = metrics_server => res,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                Ok(())
            }
        }
    } else {
        tokio::select! {
            res = front_server => res,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                Ok(())
            }
        }
    };

    health_checker.stop();
    for handle in prober_handles {
        handle.abort();
    }

    match &result {
        Ok(_) => info!("loadgate stopped gracefully"),
        Err(e) => error!("server error: {}", e),
    }

    result
}
