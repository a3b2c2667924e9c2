//! Cushion catalog server library.
//!
//! The HTTP API behind the fabric configurator: fabric records in a
//! key-value store, a sync engine that builds those records from images in
//! Supabase Storage, and admin role bookkeeping.
//!
//! The binary in `main.rs` wires configuration, logging and Sentry around
//! [`app`]; tests build the same router over in-memory backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

use axum::{Router, extract::State, http::StatusCode, middleware as axum_middleware, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use config::HttpConfig;
use state::AppState;

/// Key read by the readiness probe. It never exists; only the round trip matters.
const READINESS_PROBE_KEY: &str = "health:ready";

/// Build the full application router with middleware.
///
/// API routes are mounted under `http.base_path`; `/health` and
/// `/health/ready` are always served at the root as well.
pub fn app(state: AppState, http: &HttpConfig) -> Router {
    let api = routes::routes();
    let router = if http.base_path.is_empty() {
        api
    } else {
        Router::new()
            .route("/health", get(routes::health))
            .nest(&http.base_path, api)
    };

    router
        .route("/health/ready", get(readiness))
        .layer(middleware::cors_layer(&http.cors_allow_origin))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the key-value store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.kv().get(READINESS_PROBE_KEY).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
