//! Receipts API Module
//!
//! Print log queries, reprints and rule toggling.

mod handler;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/orders", order_routes())
        .nest("/api/receipts", receipt_routes())
        .route("/api/rules/{id}", put(handler::set_rule_enabled))
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/{id}/receipts", get(handler::list_for_order))
        .route("/{id}/reprint", post(handler::reprint_order))
}

fn receipt_routes() -> Router<ServerState> {
    Router::new()
        .route("/", delete(handler::purge))
        .route("/last", get(handler::last_order))
        .route("/{id}/reprint", post(handler::reprint_receipt))
}
