//! Kitchen Display API Module
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/kds/{prefix}/tickets | GET | open tickets of a kitchen |
//! | /api/kds/{prefix}/{seq}/{status} | POST | move a ticket (`preparing`, `ready`, `delivered`) |
//! | /api/kds/{prefix}/next-seq | PUT | reset or align the pickup counter |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/kds", kds_routes())
}

fn kds_routes() -> Router<ServerState> {
    Router::new()
        .route("/{prefix}/tickets", get(handler::board))
        .route("/{prefix}/next-seq", put(handler::reset_next_seq))
        .route("/{prefix}/{seq}/{status}", post(handler::advance))
}
