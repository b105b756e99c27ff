//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::receipt::PrintAttempt;

/// Order entity (one per checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Payment method: "cash" | "card" | ...
    pub paid_method: String,
    /// Total in cents
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Order line (immutable after checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Product name at checkout time
    pub name: String,
    pub qty: i64,
    pub unit_price_cents: i64,
    /// Resolved from the product, falling back to its category
    pub kitchen_id: Option<i64>,
    /// Pickup sequence of the line's kitchen ticket
    pub pickup_seq: Option<i64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub options: Vec<LineOption>,
}

/// Chosen option on an order line (informational, never affects routing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOption {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub price_delta_cents: i64,
}

// =============================================================================
// Checkout DTOs
// =============================================================================

/// Checkout request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default = "default_paid_method")]
    pub paid_method: String,
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

fn default_paid_method() -> String {
    "cash".to_string()
}

/// Cart line as sent by the till
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    #[serde(default = "default_qty")]
    pub qty: i64,
    /// Explicit unit price; computed from product and options when absent
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub options: Vec<CartOption>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_qty() -> i64 {
    1
}

/// Option selected in the cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartOption {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub delta: i64,
}

/// Checkout response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order_id: i64,
    pub total_cents: i64,
    /// Pickup numbers formatted "PREFIX-SEQ"
    pub pickup_numbers: Vec<String>,
    pub prints: Vec<PrintAttempt>,
}
