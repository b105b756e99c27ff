//! Receipts API Handlers
//!
//! - List logged receipts (per order, or the last printed order)
//! - Reprint a single receipt or a whole order
//! - Purge old log rows
//! - Enable / disable routing rules

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::models::{PrintedReceipt, ReceiptRule, ReprintSummary};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct ReprintResponse {
    pub receipt_id: i64,
    pub printer_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PurgeQuery {
    /// Delete rows older than this many days
    pub older_than_days: i64,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct RuleToggleRequest {
    pub enabled: bool,
}

/// GET /api/orders/{id}/receipts
pub async fn list_for_order(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<Vec<PrintedReceipt>>> {
    Ok(Json(state.engine.receipts_for_order(order_id)?))
}

/// POST /api/orders/{id}/reprint
pub async fn reprint_order(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<ReprintSummary>> {
    Ok(Json(state.engine.reprint_order(order_id).await?))
}

/// GET /api/receipts/last - receipts of the most recently printed order
pub async fn last_order(State(state): State<ServerState>) -> AppResult<Json<Vec<PrintedReceipt>>> {
    Ok(Json(state.engine.last_order_receipts()?))
}

/// POST /api/receipts/{id}/reprint
pub async fn reprint_receipt(
    State(state): State<ServerState>,
    Path(receipt_id): Path<i64>,
) -> AppResult<Json<ReprintResponse>> {
    let row = state.engine.reprint_receipt(receipt_id).await?;
    Ok(Json(ReprintResponse {
        receipt_id: row.id,
        printer_id: row.printer_id,
    }))
}

/// DELETE /api/receipts?older_than_days=N
pub async fn purge(
    State(state): State<ServerState>,
    Query(query): Query<PurgeQuery>,
) -> AppResult<Json<PurgeResponse>> {
    if query.older_than_days < 0 {
        return Err(AppError::validation("older_than_days must be >= 0"));
    }
    let cutoff = Utc::now() - chrono::Duration::days(query.older_than_days);
    let deleted = state.engine.purge_print_log(cutoff)?;
    Ok(Json(PurgeResponse { deleted }))
}

/// PUT /api/rules/{id} - enable or disable a routing rule
pub async fn set_rule_enabled(
    State(state): State<ServerState>,
    Path(rule_id): Path<i64>,
    Json(request): Json<RuleToggleRequest>,
) -> AppResult<Json<ReceiptRule>> {
    Ok(Json(state.catalog.set_rule_enabled(rule_id, request.enabled)?))
}
