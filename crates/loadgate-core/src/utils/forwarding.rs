//! Builds the `X-Forwarded-*` / `X-Load-Balancer` headers added to every
//! proxied backend request, and derives the client identifier used for
//! rate limiting from the same inbound data.

use actix_web::HttpRequest;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// `X-Forwarded-For` if present, else `X-Real-IP`, else the TCP peer
/// address. This value doubles as the rate-limiter's client identifier.
pub fn client_identifier(req: &HttpRequest) -> String {
    if let Some(xff) = req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()) {
        return xff.to_string();
    }
    if let Some(real_ip) = req.headers().get("X-Real-IP").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

pub fn build_forwarding_headers(req: &HttpRequest, client_id: &str, service_name: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in req.headers().iter() {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(n, v);
        }
    }

    let proto = if req.connection_info().scheme() == "https" { "https" } else { "http" };
    let host = req.connection_info().host().to_string();

    insert_header(&mut headers, "x-forwarded-for", client_id);
    insert_header(&mut headers, "x-forwarded-proto", proto);
    insert_header(&mut headers, "x-forwarded-host", &host);
    insert_header(&mut headers, "x-load-balancer", service_name);

    headers
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn prefers_x_forwarded_for_over_real_ip() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.5"))
            .insert_header(("X-Real-IP", "198.51.100.1"))
            .to_http_request();
        assert_eq!(client_identifier(&req), "203.0.113.5");
    }

    #[test]
    fn falls_back_to_real_ip() {
        let req = TestRequest::default()
            .insert_header(("X-Real-IP", "198.51.100.1"))
            .to_http_request();
        assert_eq!(client_identifier(&req), "198.51.100.1");
    }

    #[test]
    fn forwarding_headers_include_load_balancer_name() {
        let req = TestRequest::default().to_http_request();
        let headers = build_forwarding_headers(&req, "203.0.113.5", "loadgate");
        assert_eq!(headers.get("x-load-balancer").unwrap(), "loadgate");
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "203.0.113.5");
    }
}
