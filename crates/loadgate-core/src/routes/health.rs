//! Front-door `GET /health`: a static liveness probe, independent of
//! backend health — it answers as soon as the process is up.

use crate::state::AppState;
use actix_web::{web, HttpResponse, Result};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": state.service_name,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
