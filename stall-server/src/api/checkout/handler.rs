//! Checkout API Handlers

use axum::{Json, extract::State};
use shared::models::{CheckoutReceipt, CheckoutRequest};

use crate::core::ServerState;
use crate::utils::AppResult;

/// POST /api/checkout - place an order
///
/// Responds with the order id, total, pickup numbers (`PREFIX-SEQ`) and one
/// entry per print attempt. Failed prints do not fail the request.
pub async fn checkout(
    State(state): State<ServerState>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutReceipt>> {
    let receipt = state.checkout.checkout(request).await?;
    Ok(Json(receipt))
}
