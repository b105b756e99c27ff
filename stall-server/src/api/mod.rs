//! API routes
//!
//! - [`health`] - health checks
//! - [`checkout`] - order placement
//! - [`kds`] - kitchen display board and ticket transitions
//! - [`receipts`] - print log, reprints, rule toggling
//!
//! Every handler returns [`AppResult`]; errors render as the unified
//! `{code, message, details}` body with the matching HTTP status.

pub mod checkout;
pub mod health;
pub mod kds;
pub mod receipts;

use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
pub use crate::utils::AppResult;

/// HTTP access log
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());
    response
}

/// Routes without state
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(checkout::router())
        .merge(kds::router())
        .merge(receipts::router())
}

/// Complete application router
pub fn router(state: ServerState) -> Router {
    build_app()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(log_request))
}
