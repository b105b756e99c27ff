//! Unified error codes for the Stall workspace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order and ticket errors
//! - 6xxx: Catalog errors
//! - 7xxx: Printing errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no valid lines
    OrderEmpty = 4007,
    /// Ticket not found
    TicketNotFound = 4101,
    /// Ticket already delivered (terminal state)
    TicketAlreadyDelivered = 4102,
    /// Unknown ticket status
    InvalidTicketStatus = 4103,

    // ==================== 6xxx: Catalog ====================
    /// Kitchen not found
    KitchenNotFound = 6201,

    // ==================== 7xxx: Printing ====================
    /// Printer disabled or unreachable
    PrinterNotAvailable = 7002,
    /// Print job failed
    PrintFailed = 7003,
    /// Receipt rule not found
    RuleNotFound = 7201,
    /// Print log entry not found
    PrintLogNotFound = 7301,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order has no valid lines",
            ErrorCode::TicketNotFound => "Ticket not found",
            ErrorCode::TicketAlreadyDelivered => "Ticket already delivered",
            ErrorCode::InvalidTicketStatus => "Invalid ticket status",

            // Catalog
            ErrorCode::KitchenNotFound => "Kitchen not found",

            // Printing
            ErrorCode::PrinterNotAvailable => "Printer not available",
            ErrorCode::PrintFailed => "Print failed",
            ErrorCode::RuleNotFound => "Receipt rule not found",
            ErrorCode::PrintLogNotFound => "Print log entry not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4101 => Ok(ErrorCode::TicketNotFound),
            4102 => Ok(ErrorCode::TicketAlreadyDelivered),
            4103 => Ok(ErrorCode::InvalidTicketStatus),

            // Catalog
            6201 => Ok(ErrorCode::KitchenNotFound),

            // Printing
            7002 => Ok(ErrorCode::PrinterNotAvailable),
            7003 => Ok(ErrorCode::PrintFailed),
            7201 => Ok(ErrorCode::RuleNotFound),
            7301 => Ok(ErrorCode::PrintLogNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::TicketAlreadyDelivered.code(), 4102);
        assert_eq!(ErrorCode::KitchenNotFound.code(), 6201);
        assert_eq!(ErrorCode::PrintFailed.code(), 7003);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_roundtrips_every_code() {
        let all = [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::NotFound,
            ErrorCode::OrderNotFound,
            ErrorCode::OrderEmpty,
            ErrorCode::TicketNotFound,
            ErrorCode::TicketAlreadyDelivered,
            ErrorCode::InvalidTicketStatus,
            ErrorCode::KitchenNotFound,
            ErrorCode::PrinterNotAvailable,
            ErrorCode::PrintFailed,
            ErrorCode::RuleNotFound,
            ErrorCode::PrintLogNotFound,
            ErrorCode::InternalError,
            ErrorCode::DatabaseError,
            ErrorCode::ConfigError,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::TicketAlreadyDelivered).unwrap();
        assert_eq!(json, "4102");
        let code: ErrorCode = serde_json::from_str("7003").unwrap();
        assert_eq!(code, ErrorCode::PrintFailed);
        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }
}
