//! Receipt Routing Models
//!
//! Printers, templates, routing rules and the print log row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network thermal printer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Printer {
    pub id: i64,
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Characters per line at normal size
    #[serde(default = "default_width_chars")]
    pub width_chars: u32,
    #[serde(default)]
    pub logo_path: Option<String>,
}

fn default_port() -> u16 {
    9100
}

fn default_width_chars() -> u32 {
    32
}

fn default_true() -> bool {
    true
}

/// Receipt template (inline markup body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptTemplate {
    pub id: i64,
    pub name: String,
    pub body: String,
    #[serde(default = "default_true")]
    pub cut: bool,
}

/// How a rule selects order lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Lines routed to the rule's kitchen
    Kds,
    /// Lines whose product is in the rule's product set
    ProductSet,
    /// Anything else; the rule never matches
    #[serde(other)]
    Unrecognized,
}

impl RuleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kds => "kds",
            Self::ProductSet => "product_set",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Receipt routing rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRule {
    pub id: i64,
    pub name: String,
    pub mode: RuleMode,
    #[serde(default)]
    pub kitchen_id: Option<i64>,
    pub printer_id: Option<i64>,
    pub template_id: Option<i64>,
    /// Values below 1 print once
    #[serde(default = "default_copies")]
    pub copies: i32,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub consume_lines: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Product ids for `product_set` mode
    #[serde(default)]
    pub product_ids: Vec<i64>,
}

fn default_copies() -> i32 {
    1
}

fn default_priority() -> i32 {
    100
}

impl ReceiptRule {
    pub fn effective_copies(&self) -> u32 {
        self.copies.max(1) as u32
    }
}

/// Outcome of one physical print attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintStatus {
    Ok,
    Error,
}

/// Print log row (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintedReceipt {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub order_id: i64,
    pub rule_id: i64,
    pub template_id: i64,
    pub printer_id: i64,
    pub kitchen_id: Option<i64>,
    /// Rendered markup as sent to the printer
    pub body: String,
    pub cut: bool,
    pub status: PrintStatus,
    pub error_text: Option<String>,
    /// First non-blank line of the body
    pub summary: String,
}

/// Result of a print attempt as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintAttempt {
    /// Absent when the attempt could not be logged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<i64>,
    pub rule_id: i64,
    pub printer_id: i64,
    /// 1-based copy number
    pub copy: u32,
    pub status: PrintStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PrintedReceipt> for PrintAttempt {
    fn from(row: &PrintedReceipt) -> Self {
        Self {
            receipt_id: Some(row.id),
            rule_id: row.rule_id,
            printer_id: row.printer_id,
            copy: 1,
            status: row.status,
            error: row.error_text.clone(),
        }
    }
}

/// Result of reprinting an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprintSummary {
    pub reprinted: u32,
    pub failed: u32,
}
