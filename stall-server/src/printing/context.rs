//! Template context for one rule firing

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use shared::models::{Kitchen, LineOption, Order, OrderLine, Printer, ReceiptRule};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn local(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format(DATETIME_FORMAT).to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptContext {
    pub now: String,
    pub event_name: String,
    pub order: OrderContext,
    pub kitchen: Option<KitchenContext>,
    pub lines: Vec<LineContext>,
    pub rule: RuleContext,
    pub printer_logo: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderContext {
    pub id: i64,
    pub datetime: String,
    pub total_cents: i64,
    pub paid_method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KitchenContext {
    pub id: i64,
    pub name: String,
    pub prefix: String,
    pub pickup_seq: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineContext {
    pub name: String,
    /// Units still unclaimed when the rule fired
    pub qty: i64,
    pub unit_price_cents: i64,
    pub options: Vec<LineOption>,
    pub notes: Option<String>,
    pub pickup_seq: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleContext {
    pub id: i64,
    pub name: String,
    pub mode: &'static str,
}

impl LineContext {
    pub fn new(line: &OrderLine, remaining: i64) -> Self {
        Self {
            name: line.name.clone(),
            qty: remaining,
            unit_price_cents: line.unit_price_cents,
            options: line.options.clone(),
            notes: line.notes.clone(),
            pickup_seq: line.pickup_seq,
        }
    }
}

/// Inputs shared by every rule of a routing pass
pub struct ContextBuilder<'a> {
    pub event_name: &'a str,
    pub timezone: Tz,
    pub order: &'a Order,
    pub now: DateTime<Utc>,
}

impl ContextBuilder<'_> {
    pub fn build(
        &self,
        rule: &ReceiptRule,
        kitchen: Option<&Kitchen>,
        printer: &Printer,
        lines: Vec<LineContext>,
    ) -> ReceiptContext {
        // the ticket number is the one carried by the first matched line
        let kitchen = kitchen.map(|k| KitchenContext {
            id: k.id,
            name: k.name.clone(),
            prefix: k.prefix.clone(),
            pickup_seq: lines.first().and_then(|l| l.pickup_seq),
        });

        ReceiptContext {
            now: local(self.now, self.timezone),
            event_name: self.event_name.to_string(),
            order: OrderContext {
                id: self.order.id,
                datetime: local(self.order.created_at, self.timezone),
                total_cents: self.order.total_cents,
                paid_method: self.order.paid_method.clone(),
            },
            kitchen,
            lines,
            rule: RuleContext {
                id: rule.id,
                name: rule.name.clone(),
                mode: rule.mode.as_str(),
            },
            printer_logo: printer.logo_path.clone(),
        }
    }
}
