//! Ticket Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kitchen ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Queued,
    Prepping,
    Ready,
    Delivered,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Prepping => "prepping",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
        }
    }

    /// Still shown on the kitchen board
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Delivered)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ticket status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    /// Accepts "preparing" as an alias of "prepping" (kitchen display action name)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "prepping" | "preparing" => Ok(Self::Prepping),
            "ready" => Ok(Self::Ready),
            "delivered" => Ok(Self::Delivered),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Ticket entity: one per (kitchen, order)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub kitchen_id: i64,
    pub order_id: i64,
    pub pickup_seq: i64,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Kitchen board
// =============================================================================

/// Option shown on a board item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardOption {
    pub name: String,
    pub value: String,
}

/// Line shown on a board ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardItem {
    pub name: String,
    pub qty: i64,
    pub options: Vec<BoardOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Open ticket as listed on the kitchen display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardTicket {
    pub id: i64,
    pub seq: i64,
    pub status: TicketStatus,
    pub order_id: i64,
    pub order_created_at: DateTime<Utc>,
    pub items: Vec<BoardItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("preparing".parse::<TicketStatus>(), Ok(TicketStatus::Prepping));
        assert_eq!("READY".parse::<TicketStatus>(), Ok(TicketStatus::Ready));
        assert!("cooking".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&TicketStatus::Delivered).unwrap();
        assert_eq!(json, "\"delivered\"");
        assert!(!TicketStatus::Delivered.is_open());
        assert!(TicketStatus::Ready.is_open());
    }
}
