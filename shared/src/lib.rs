//! Shared types for the Stall workspace
//!
//! Domain models, the unified error type and kitchen display events used by
//! both the printer crate consumers and the server.

pub mod error;
pub mod message;
pub mod models;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use message::KitchenEvent;
