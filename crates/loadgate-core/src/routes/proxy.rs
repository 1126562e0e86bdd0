//! The catch-all handler: every request that isn't `/health` or `/status`
//! lands here and is fed into the dispatch pipeline for `upstreams[0]`.

use crate::models::error::GatewayError;
use crate::state::AppState;
use crate::utils::forwarding::{build_forwarding_headers, client_identifier};
use actix_web::{web, HttpRequest, HttpResponse};

pub async fn proxy(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let pipeline = state.pipeline.as_ref().ok_or(GatewayError::NoUpstreamConfigured)?;

    let client_id = client_identifier(&req);
    let forward_headers = build_forwarding_headers(&req, &client_id, &pipeline.upstream.name);
    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let proxied = pipeline
        .dispatch(&client_id, method, path_and_query, forward_headers, body.into())
        .await?;

    let mut builder = HttpResponse::build(
        actix_web::http::StatusCode::from_u16(proxied.status)
            .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY),
    );
    for (name, value) in proxied.headers.iter() {
        if let (Ok(n), Ok(v)) = (
            actix_web::http::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            actix_web::http::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            builder.insert_header((n, v));
        }
    }

    Ok(builder.body(proxied.body))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.default_service(web::route().to(proxy));
}
