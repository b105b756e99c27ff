//! Kitchen, Category and Product Models

use serde::{Deserialize, Serialize};

/// Preparation station with its own pickup numbering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kitchen {
    pub id: i64,
    pub name: String,
    /// Short prefix shown on pickup numbers, e.g. "PIZ" in "PIZ-12"
    pub prefix: String,
    /// Next pickup sequence to hand out
    #[serde(default = "default_next_seq")]
    pub next_seq: i64,
}

fn default_next_seq() -> i64 {
    1
}

impl Kitchen {
    /// Pickup number as displayed to customers
    pub fn pickup_label(&self, seq: i64) -> String {
        format!("{}-{}", self.prefix, seq)
    }
}

/// Product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Fallback kitchen for products without their own
    #[serde(default)]
    pub kitchen_id: Option<i64>,
}

/// Sellable product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Price in cents
    pub price_cents: i64,
    #[serde(default)]
    pub kitchen_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
}
