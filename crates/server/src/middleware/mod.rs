//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS

pub mod request_id;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};

/// CORS for browser clients: the configured origin (or `*`), the methods the
/// API uses, and a ten minute preflight cache.
#[must_use]
pub fn cors_layer(allow_origin: &str) -> CorsLayer {
    let origin = match allow_origin {
        "*" => AllowOrigin::any(),
        exact => HeaderValue::from_str(exact).map_or_else(
            |_| {
                tracing::warn!(origin = exact, "invalid CORS origin, allowing any");
                AllowOrigin::any()
            },
            AllowOrigin::exact,
        ),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(600))
}
