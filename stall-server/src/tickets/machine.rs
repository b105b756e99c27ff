//! Ticket state machine
//!
//! ```text
//! queued ──▶ prepping ──▶ ready ──▶ delivered (terminal)
//! ```
//!
//! Staff may jump to any status (or re-apply the current one) as long as the
//! ticket has not been delivered.

use shared::KitchenEvent;
use shared::error::{AppError, ErrorCode};
use shared::models::TicketStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Ticket already delivered")]
    AlreadyDelivered,
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::AlreadyDelivered => {
                AppError::with_message(ErrorCode::TicketAlreadyDelivered, err.to_string())
            }
        }
    }
}

/// Validate a status change
pub fn transition(
    current: TicketStatus,
    target: TicketStatus,
) -> Result<TicketStatus, TransitionError> {
    match current {
        TicketStatus::Delivered => Err(TransitionError::AlreadyDelivered),
        _ => Ok(target),
    }
}

/// Events broadcast after a successful transition
pub fn transition_events(prefix: &str, seq: i64, status: TicketStatus) -> Vec<KitchenEvent> {
    let update = KitchenEvent::TicketUpdate {
        prefix: prefix.to_string(),
        seq,
        status,
    };
    let follow_up = match status {
        TicketStatus::Prepping => Some(KitchenEvent::DisplayRefresh {
            prefix: prefix.to_string(),
        }),
        TicketStatus::Ready => Some(KitchenEvent::TicketReady {
            prefix: prefix.to_string(),
            seq,
        }),
        TicketStatus::Delivered => Some(KitchenEvent::TicketDelivered {
            prefix: prefix.to_string(),
            seq,
        }),
        TicketStatus::Queued => None,
    };

    std::iter::once(update).chain(follow_up).collect()
}
