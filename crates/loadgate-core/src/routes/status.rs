//! Front-door `GET /status`: a richer introspection snapshot than
//! `/health`, summarizing configured upstreams and live backend health.

use crate::state::AppState;
use actix_web::{web, HttpResponse, Result};
use serde_json::json;

pub async fn status_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let total = state.backend_urls.len();
    let healthy = state
        .backend_urls
        .iter()
        .filter(|url| state.health_checker.is_healthy(url))
        .count();

    Ok(HttpResponse::Ok().json(json!({
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "upstreams": state.upstream_count,
        "backends": {
            "total": total,
            "healthy": healthy,
            "unhealthy": total - healthy,
        },
        "health_checks_enabled": state.health_checks_enabled,
        "metrics_enabled": state.metrics_enabled,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(status_check));
}
