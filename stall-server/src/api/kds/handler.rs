//! Kitchen Display API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::error::ErrorCode;
use shared::models::{BoardTicket, TicketStatus};

use crate::core::ServerState;
use crate::db::MAX_PICKUP_SEQ;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct TicketUpdateResponse {
    pub id: i64,
    pub prefix: String,
    pub seq: i64,
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct NextSeqRequest {
    pub next_seq: i64,
}

#[derive(Debug, Serialize)]
pub struct NextSeqResponse {
    pub prefix: String,
    pub next_seq: i64,
}

/// GET /api/kds/{prefix}/tickets - open tickets by pickup number
pub async fn board(
    State(state): State<ServerState>,
    Path(prefix): Path<String>,
) -> AppResult<Json<Vec<BoardTicket>>> {
    let board = state.tickets.board(&prefix)?;
    Ok(Json(board))
}

/// POST /api/kds/{prefix}/{seq}/{status} - move a ticket
///
/// 409 when the ticket was already delivered.
pub async fn advance(
    State(state): State<ServerState>,
    Path((prefix, seq, status)): Path<(String, i64, String)>,
) -> AppResult<Json<TicketUpdateResponse>> {
    let target: TicketStatus = status.parse().map_err(|e: shared::models::UnknownStatus| {
        AppError::with_message(ErrorCode::InvalidTicketStatus, e.to_string())
            .with_detail("status", status.clone())
    })?;

    let ticket = state.tickets.advance(&prefix, seq, target)?;
    let prefix = state
        .catalog
        .kitchen(ticket.kitchen_id)
        .map(|k| k.prefix)
        .unwrap_or(prefix);
    Ok(Json(TicketUpdateResponse {
        id: ticket.id,
        prefix,
        seq: ticket.pickup_seq,
        status: ticket.status,
    }))
}

/// PUT /api/kds/{prefix}/next-seq - reset or align the pickup counter
pub async fn reset_next_seq(
    State(state): State<ServerState>,
    Path(prefix): Path<String>,
    Json(request): Json<NextSeqRequest>,
) -> AppResult<Json<NextSeqResponse>> {
    if !(1..=MAX_PICKUP_SEQ).contains(&request.next_seq) {
        return Err(
            AppError::validation(format!("next_seq must be between 1 and {MAX_PICKUP_SEQ}"))
                .with_detail("next_seq", request.next_seq),
        );
    }
    let kitchen = state.catalog.kitchen_by_prefix(&prefix).ok_or_else(|| {
        AppError::new(ErrorCode::KitchenNotFound).with_detail("prefix", prefix.clone())
    })?;

    state
        .store
        .reset_next_seq(kitchen.id, request.next_seq)
        .await?;
    Ok(Json(NextSeqResponse {
        prefix: kitchen.prefix,
        next_seq: request.next_seq,
    }))
}
