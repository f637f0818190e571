//! Katha Vault server library.
//!
//! A JSON API for serialized fiction: novels and chapters, threaded
//! comments, a community feed, reader libraries and follows, an admin
//! moderation surface and a model-backed writing assistant.
//!
//! The router is built here so integration tests can serve it on an
//! ephemeral port without going through `main`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::services::uploads::PUBLIC_PREFIX;
use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// Sentry layers are left to the binary so tests do not need a client.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let session_layer = create_session_layer(config);
    let uploads = ServeDir::new(&config.uploads_dir);

    let origin = HeaderValue::from_str(config.base_url.trim_end_matches('/')).ok();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origin))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    routes::routes(config.rate_limit)
        .nest_service(PUBLIC_PREFIX.trim_end_matches('/'), uploads)
        .layer(session_layer)
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware))
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
}
