//! Side-car metrics listener: its own `HttpServer`, independent of the
//! front-door one, exposing `GET <metrics_path>` and `GET /health`.

use crate::services::metrics::MetricsCollector;
use actix_web::{web, HttpResponse, Result};
use serde_json::json;

pub async fn metrics_endpoint(metrics: web::Data<MetricsCollector>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics.render()))
}

pub async fn health_endpoint() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

pub fn configure(path: String) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.route(&path, web::get().to(metrics_endpoint))
            .route("/health", web::get().to(health_endpoint));
    }
}
