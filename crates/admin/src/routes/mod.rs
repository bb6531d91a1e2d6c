//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (store ping)
//!
//! # Pages (one set per resource: brands, categories, products, customers, orders)
//! GET  /                           - Redirect to the first resource
//! GET  /search?q=                  - Global product search
//! GET  /{resource}                 - Table (search, sort, filters, pagination)
//! GET  /{resource}/create          - Create form
//! POST /{resource}                 - Create
//! GET  /{resource}/{id}            - Detail page
//! GET  /{resource}/{id}/edit       - Edit form
//! POST /{resource}/{id}            - Update
//! POST /{resource}/{id}/delete     - Delete (orders: soft delete)
//! POST /{resource}/bulk-delete     - Bulk delete
//! POST /orders/{id}/restore        - Restore a soft-deleted order
//! POST /orders/{id}/force-delete   - Delete an order permanently
//!
//! # JSON API
//! GET  /api/schema/{resource}      - Table and form schema
//! ...  /api/{resource}             - See `api`
//! ```

pub mod api;
pub mod pages;

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the route table.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(api::router())
        .merge(pages::router())
}

/// Build the complete application with request tracing.
pub fn app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                status = tracing::field::Empty,
                latency_ms = tracing::field::Empty,
            )
        })
        .on_response(
            |response: &axum::http::Response<axum::body::Body>, latency: Duration, span: &Span| {
                span.record("status", response.status().as_u16());
                span.record(
                    "latency_ms",
                    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                );
                DefaultOnResponse::default().on_response(response, latency, span);
            },
        );

    routes()
        .layer(ServiceBuilder::new().layer(trace))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store().backend(), "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
