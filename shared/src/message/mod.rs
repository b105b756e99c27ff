//! Kitchen display events
//!
//! Published on the server's event bus and serialized as
//! `{"type": "...", ...}` for display clients.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::TicketStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KitchenEvent {
    /// New tickets were created for these kitchen prefixes
    TicketsCreated { kitchens: Vec<String> },
    /// A ticket changed status
    TicketUpdate {
        prefix: String,
        seq: i64,
        status: TicketStatus,
    },
    /// The kitchen display should reload its board
    DisplayRefresh { prefix: String },
    /// A ticket is ready for pickup
    TicketReady { prefix: String, seq: i64 },
    /// A ticket was handed over
    TicketDelivered { prefix: String, seq: i64 },
}

impl KitchenEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TicketsCreated { .. } => "tickets_created",
            Self::TicketUpdate { .. } => "ticket_update",
            Self::DisplayRefresh { .. } => "display_refresh",
            Self::TicketReady { .. } => "ticket_ready",
            Self::TicketDelivered { .. } => "ticket_delivered",
        }
    }
}

impl fmt::Display for KitchenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
