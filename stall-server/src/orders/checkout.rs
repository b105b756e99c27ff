//! Checkout
//!
//! Turns a cart into an order, numbered kitchen tickets and receipts:
//!
//! ```text
//! cart ──▶ validate + price ──▶ lock kitchens ──▶ reserve pickup numbers
//!      ──▶ order + lines + tickets ──▶ commit ──▶ route receipts ──▶ tickets_created
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::KitchenEvent;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{CartLine, CheckoutReceipt, CheckoutRequest, LineOption, OrderLine, Product};

use crate::db::{Catalog, OrderStore};
use crate::message::EventBus;
use crate::printing::ReceiptRoutingEngine;

/// A cart line that passed validation
#[derive(Debug, Clone)]
struct PricedLine {
    product: Product,
    kitchen_id: Option<i64>,
    qty: i64,
    unit_price_cents: i64,
    options: Vec<LineOption>,
    notes: Option<String>,
}

/// Explicit price if given, else catalog price plus option deltas; never negative
fn unit_price(product: &Product, line: &CartLine) -> i64 {
    line.unit_price_cents
        .unwrap_or_else(|| {
            line.options
                .iter()
                .fold(product.price_cents, |acc, o| acc.saturating_add(o.delta))
        })
        .max(0)
}

/// Sum of `unit price × qty`; `None` when it does not fit in an i64
fn order_total(lines: &[PricedLine]) -> Option<i64> {
    lines.iter().try_fold(0i64, |acc, l| {
        l.unit_price_cents
            .checked_mul(l.qty)
            .and_then(|amount| acc.checked_add(amount))
    })
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    catalog: Arc<Catalog>,
    store: Arc<OrderStore>,
    engine: Arc<ReceiptRoutingEngine>,
    bus: EventBus,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<OrderStore>,
        engine: Arc<ReceiptRoutingEngine>,
        bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            store,
            engine,
            bus,
        }
    }

    fn price_lines(&self, request: &CheckoutRequest) -> Vec<PricedLine> {
        request
            .lines
            .iter()
            .filter_map(|line| {
                if line.qty < 1 {
                    tracing::debug!(product_id = line.product_id, qty = line.qty, "Skipping empty line");
                    return None;
                }
                let Some(product) = self.catalog.product(line.product_id) else {
                    tracing::warn!(product_id = line.product_id, "Skipping unknown product");
                    return None;
                };
                let kitchen_id = self
                    .catalog
                    .resolve_kitchen(&product)
                    .filter(|id| match self.catalog.kitchen(*id) {
                        Some(_) => true,
                        None => {
                            tracing::warn!(product_id = product.id, kitchen_id = id, "Product kitchen does not exist");
                            false
                        }
                    });

                Some(PricedLine {
                    kitchen_id,
                    qty: line.qty,
                    unit_price_cents: unit_price(&product, line),
                    options: line
                        .options
                        .iter()
                        .map(|o| LineOption {
                            name: o.name.clone(),
                            value: o.value.clone(),
                            price_delta_cents: o.delta,
                        })
                        .collect(),
                    notes: line.notes.clone().filter(|n| !n.trim().is_empty()),
                    product,
                })
            })
            .collect()
    }

    /// Place an order
    ///
    /// Print failures never fail the checkout; they are reported in
    /// [`CheckoutReceipt::prints`].
    #[tracing::instrument(skip_all, fields(lines = request.lines.len()))]
    pub async fn checkout(&self, request: CheckoutRequest) -> AppResult<CheckoutReceipt> {
        let lines = self.price_lines(&request);
        if lines.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }

        let total_cents = order_total(&lines).ok_or_else(|| {
            tracing::warn!(lines = lines.len(), "Order total overflows");
            AppError::validation("Order total is too large")
        })?;
        let kitchen_ids: Vec<i64> = lines.iter().filter_map(|l| l.kitchen_id).collect();

        let mut txn = self.store.begin_checkout(&kitchen_ids).await;
        let mut seqs = BTreeMap::new();
        for id in &kitchen_ids {
            seqs.insert(*id, txn.reserve_next(*id)?);
        }

        txn.insert_order(&request.paid_method, total_cents);
        for line in lines {
            txn.insert_line(OrderLine {
                id: 0,
                order_id: 0,
                product_id: line.product.id,
                name: line.product.name,
                qty: line.qty,
                unit_price_cents: line.unit_price_cents,
                kitchen_id: line.kitchen_id,
                pickup_seq: line.kitchen_id.and_then(|id| seqs.get(&id).copied()),
                notes: line.notes,
                options: line.options,
            })?;
        }
        for id in seqs.keys() {
            txn.insert_ticket(*id)?;
        }
        let order = txn.commit()?;

        let mut pickup_numbers = Vec::with_capacity(seqs.len());
        let mut prefixes = Vec::with_capacity(seqs.len());
        for (id, seq) in &seqs {
            if let Some(kitchen) = self.catalog.kitchen(*id) {
                pickup_numbers.push(kitchen.pickup_label(*seq));
                prefixes.push(kitchen.prefix);
            }
        }
        tracing::info!(
            order_id = order.id,
            total_cents,
            pickup = ?pickup_numbers,
            "Order placed"
        );

        let prints = match self.engine.route(order.id).await {
            Ok(prints) => prints,
            Err(e) => {
                tracing::error!(order_id = order.id, error = %e, "Receipt routing failed");
                Vec::new()
            }
        };

        if !prefixes.is_empty() {
            prefixes.sort();
            self.bus.publish(KitchenEvent::TicketsCreated { kitchens: prefixes });
        }

        Ok(CheckoutReceipt {
            order_id: order.id,
            total_cents,
            pickup_numbers,
            prints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::CartOption;

    fn product(price_cents: i64) -> Product {
        Product {
            id: 1,
            name: "Panino".into(),
            price_cents,
            kitchen_id: None,
            category_id: None,
        }
    }

    fn cart(unit_price_cents: Option<i64>, deltas: &[i64]) -> CartLine {
        CartLine {
            product_id: 1,
            qty: 1,
            unit_price_cents,
            options: deltas
                .iter()
                .map(|d| CartOption {
                    name: "extra".into(),
                    value: "x".into(),
                    delta: *d,
                })
                .collect(),
            notes: None,
        }
    }

    fn priced(unit_price_cents: i64, qty: i64) -> PricedLine {
        PricedLine {
            product: product(unit_price_cents),
            kitchen_id: None,
            qty,
            unit_price_cents,
            options: vec![],
            notes: None,
        }
    }

    #[test]
    fn test_order_total() {
        assert_eq!(order_total(&[priced(700, 2), priced(400, 1)]), Some(1800));
        assert_eq!(order_total(&[]), Some(0));
        assert_eq!(order_total(&[priced(10, i64::MAX / 2)]), None);
        assert_eq!(order_total(&[priced(i64::MAX, 1), priced(1, 1)]), None);
    }

    #[test]
    fn test_unit_price() {
        assert_eq!(unit_price(&product(500), &cart(None, &[])), 500);
        assert_eq!(unit_price(&product(500), &cart(None, &[100, 50])), 650);
        assert_eq!(unit_price(&product(500), &cart(Some(300), &[100])), 300);
        assert_eq!(unit_price(&product(100), &cart(None, &[-300])), 0);
        assert_eq!(unit_price(&product(100), &cart(Some(-5), &[])), 0);
        assert_eq!(unit_price(&product(i64::MAX), &cart(None, &[1])), i64::MAX);
        assert_eq!(unit_price(&product(i64::MIN), &cart(None, &[-1])), 0);
    }
}
