//! Receipt routing engine
//!
//! For one order, walks the enabled rules by priority and decides which
//! printer prints which lines with which template:
//!
//! ```text
//! lines ──▶ remaining qty ──▶ rule 1 (kds / product_set) ──▶ render ──▶ copies × dispatch ──▶ log
//!                │                        │ consume_lines
//!                └──────── zeroed ◀───────┘
//!                              ──▶ rule 2 ...
//! ```
//!
//! Lines no rule claims are neither printed nor logged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    OrderLine, PrintAttempt, PrintStatus, PrintedReceipt, Printer, ReceiptRule, ReprintSummary,
    RuleMode,
};
use stall_printer::{Dispatch, MAX_ERROR_LEN, truncate_chars};

use super::context::{ContextBuilder, LineContext};
use super::renderer::TemplateRenderer;
use crate::db::{Catalog, NewReceipt, OrderStore, ReceiptLog};

const SUMMARY_LEN: usize = 120;
const PRINTER_UNAVAILABLE: &str = "Printer not enabled or missing";

/// First non-blank line, trimmed and capped
pub fn summarize(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| truncate_chars(l, SUMMARY_LEN))
        .unwrap_or_default()
}

/// Indices of lines a rule claims
fn match_rule(rule: &ReceiptRule, lines: &[OrderLine], remaining: &[i64]) -> Option<Vec<usize>> {
    let claims = |line: &OrderLine| match rule.mode {
        RuleMode::Kds => rule.kitchen_id.is_some() && line.kitchen_id == rule.kitchen_id,
        RuleMode::ProductSet => rule.product_ids.contains(&line.product_id),
        RuleMode::Unrecognized => false,
    };
    if rule.mode == RuleMode::Unrecognized {
        return None;
    }
    Some(
        lines
            .iter()
            .enumerate()
            .filter(|&(i, line)| remaining[i] > 0 && claims(line))
            .map(|(i, _)| i)
            .collect(),
    )
}

pub struct ReceiptRoutingEngine {
    catalog: Arc<Catalog>,
    store: Arc<OrderStore>,
    log: Arc<dyn ReceiptLog>,
    renderer: Arc<dyn TemplateRenderer>,
    dispatcher: Arc<dyn Dispatch>,
    event_name: String,
    timezone: Tz,
}

impl std::fmt::Debug for ReceiptRoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptRoutingEngine")
            .field("event_name", &self.event_name)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl ReceiptRoutingEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<OrderStore>,
        log: Arc<dyn ReceiptLog>,
        renderer: Arc<dyn TemplateRenderer>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        Self {
            catalog,
            store,
            log,
            renderer,
            dispatcher,
            event_name: "STALL".to_string(),
            timezone: chrono_tz::Europe::Rome,
        }
    }

    pub fn with_event_name(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = event_name.into();
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn print_log(&self) -> &dyn ReceiptLog {
        self.log.as_ref()
    }

    /// Run every enabled rule against an order and print what they claim
    ///
    /// Returns one attempt per physical copy, in print order.
    #[tracing::instrument(skip(self))]
    pub async fn route(&self, order_id: i64) -> AppResult<Vec<PrintAttempt>> {
        let order = self.store.order(order_id)?.ok_or_else(|| {
            AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id)
        })?;
        let lines = self.store.lines(order_id)?;
        let mut remaining: Vec<i64> = lines.iter().map(|l| l.qty).collect();

        let builder = ContextBuilder {
            event_name: &self.event_name,
            timezone: self.timezone,
            order: &order,
            now: Utc::now(),
        };

        let mut attempts = Vec::new();
        for rule in self.catalog.enabled_rules() {
            let Some(matched) = match_rule(&rule, &lines, &remaining) else {
                tracing::debug!(rule_id = rule.id, "Unrecognized rule mode, skipping");
                continue;
            };
            if matched.is_empty() {
                continue;
            }

            let template = rule.template_id.and_then(|id| self.catalog.template(id));
            let printer = rule.printer_id.and_then(|id| self.catalog.printer(id));
            let (Some(template), Some(printer)) = (template, printer) else {
                tracing::warn!(
                    rule_id = rule.id,
                    template_id = ?rule.template_id,
                    printer_id = ?rule.printer_id,
                    "Rule references a missing template or printer, skipping"
                );
                continue;
            };
            let kitchen = match rule.mode {
                RuleMode::Kds => rule.kitchen_id.and_then(|id| self.catalog.kitchen(id)),
                _ => None,
            };

            let payload = matched
                .iter()
                .map(|&i| LineContext::new(&lines[i], remaining[i]))
                .collect();
            let ctx = builder.build(&rule, kitchen.as_ref(), &printer, payload);
            let ctx = serde_json::to_value(&ctx)
                .map_err(|e| AppError::internal(format!("Receipt context: {e}")))?;

            let body = match self.renderer.render(&template.body, &ctx) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        rule_id = rule.id,
                        template_id = template.id,
                        error = %e,
                        "Template render failed, skipping rule"
                    );
                    continue;
                }
            };
            let summary = summarize(&body);

            for copy in 1..=rule.effective_copies() {
                let (status, error_text) = self.print_copy(&printer, &body, template.cut).await;
                let logged = self.log.append(NewReceipt {
                    order_id,
                    rule_id: rule.id,
                    template_id: template.id,
                    printer_id: printer.id,
                    kitchen_id: kitchen.as_ref().map(|k| k.id),
                    body: body.clone(),
                    cut: template.cut,
                    status,
                    error_text: error_text.clone(),
                    summary: summary.clone(),
                });
                // a log failure still reports the attempt
                let attempt = match logged {
                    Ok(row) => PrintAttempt {
                        copy,
                        ..PrintAttempt::from(&row)
                    },
                    Err(e) => {
                        tracing::error!(
                            order_id,
                            rule_id = rule.id,
                            copy,
                            error = %e,
                            "Print attempt not logged"
                        );
                        PrintAttempt {
                            receipt_id: None,
                            rule_id: rule.id,
                            printer_id: printer.id,
                            copy,
                            status,
                            error: error_text,
                        }
                    }
                };
                attempts.push(attempt);
            }

            if rule.consume_lines {
                for &i in &matched {
                    remaining[i] = 0;
                }
            }
        }

        let leftover = remaining.iter().filter(|r| **r > 0).count();
        tracing::info!(
            order_id,
            attempts = attempts.len(),
            failed = attempts.iter().filter(|a| a.status == PrintStatus::Error).count(),
            leftover_lines = leftover,
            "Order routed"
        );
        Ok(attempts)
    }

    async fn print_copy(
        &self,
        printer: &Printer,
        body: &str,
        cut: bool,
    ) -> (PrintStatus, Option<String>) {
        if !printer.enabled {
            return (PrintStatus::Error, Some(PRINTER_UNAVAILABLE.to_string()));
        }
        let outcome = self
            .dispatcher
            .dispatch(&printer.host, printer.port, body, cut)
            .await;
        if outcome.ok {
            (PrintStatus::Ok, None)
        } else {
            tracing::warn!(
                printer_id = printer.id,
                host = %printer.host,
                port = printer.port,
                error = ?outcome.error,
                "Print failed"
            );
            (PrintStatus::Error, outcome.error)
        }
    }

    fn available_printer(&self, printer_id: i64) -> Option<Printer> {
        self.catalog.printer(printer_id).filter(|p| p.enabled)
    }

    // ========== Reprint ==========

    /// Send a logged receipt to its printer again
    ///
    /// Reprints are not logged.
    #[tracing::instrument(skip(self))]
    pub async fn reprint_receipt(&self, receipt_id: i64) -> AppResult<PrintedReceipt> {
        let row = self.log.get(receipt_id)?.ok_or_else(|| {
            AppError::new(ErrorCode::PrintLogNotFound).with_detail("receipt_id", receipt_id)
        })?;
        let printer = self.available_printer(row.printer_id).ok_or_else(|| {
            AppError::with_message(ErrorCode::PrinterNotAvailable, PRINTER_UNAVAILABLE)
                .with_detail("printer_id", row.printer_id)
        })?;

        let outcome = self
            .dispatcher
            .dispatch(&printer.host, printer.port, &row.body, row.cut)
            .await;
        if !outcome.ok {
            let message = outcome.error.unwrap_or_else(|| "Print failed".to_string());
            return Err(AppError::with_message(
                ErrorCode::PrintFailed,
                truncate_chars(&message, MAX_ERROR_LEN),
            )
            .with_detail("receipt_id", receipt_id));
        }

        tracing::info!(receipt_id, printer_id = printer.id, "Receipt reprinted");
        Ok(row)
    }

    /// Reprint every logged receipt of an order, in log order
    #[tracing::instrument(skip(self))]
    pub async fn reprint_order(&self, order_id: i64) -> AppResult<ReprintSummary> {
        let rows = self.log.list_for_order(order_id)?;
        if rows.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::NotFound,
                format!("No receipts logged for order {order_id}"),
            )
            .with_detail("order_id", order_id));
        }

        let mut summary = ReprintSummary::default();
        for row in &rows {
            let ok = match self.available_printer(row.printer_id) {
                Some(printer) => {
                    self.dispatcher
                        .dispatch(&printer.host, printer.port, &row.body, row.cut)
                        .await
                        .ok
                }
                None => false,
            };
            if ok {
                summary.reprinted += 1;
            } else {
                summary.failed += 1;
            }
        }

        tracing::info!(
            order_id,
            reprinted = summary.reprinted,
            failed = summary.failed,
            "Order receipts reprinted"
        );
        Ok(summary)
    }

    // ========== Log queries ==========

    pub fn receipts_for_order(&self, order_id: i64) -> AppResult<Vec<PrintedReceipt>> {
        Ok(self.log.list_for_order(order_id)?)
    }

    pub fn last_order_receipts(&self) -> AppResult<Vec<PrintedReceipt>> {
        Ok(self.log.last_order_receipts()?)
    }

    pub fn purge_print_log(&self, older_than: DateTime<Utc>) -> AppResult<usize> {
        Ok(self.log.purge_older_than(older_than)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogSeed, PrintLog, PrintLogResult, PrintLogStats};
    use crate::printing::HandlebarsRenderer;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared::models::{Kitchen, Product, ReceiptTemplate};
    use stall_printer::DispatchOutcome;

    /// Records dispatches; hosts named "down" fail
    #[derive(Default)]
    struct RecordingDispatcher {
        calls: Mutex<Vec<(String, String, bool)>>,
    }

    #[async_trait]
    impl Dispatch for RecordingDispatcher {
        async fn dispatch(&self, host: &str, _port: u16, text: &str, cut: bool) -> DispatchOutcome {
            self.calls.lock().push((host.to_string(), text.to_string(), cut));
            if host == "down" {
                DispatchOutcome::failure("Connection refused")
            } else {
                DispatchOutcome::success()
            }
        }
    }

    /// Print log that refuses to append rows of one rule
    struct FailingLog {
        inner: PrintLog,
        failing_rule: i64,
    }

    impl ReceiptLog for FailingLog {
        fn append(&self, receipt: NewReceipt) -> PrintLogResult<PrintedReceipt> {
            if receipt.rule_id == self.failing_rule {
                return Err(serde_json::from_str::<i64>("disk full").unwrap_err().into());
            }
            self.inner.append(receipt)
        }

        fn get(&self, id: i64) -> PrintLogResult<Option<PrintedReceipt>> {
            self.inner.get(id)
        }

        fn list_for_order(&self, order_id: i64) -> PrintLogResult<Vec<PrintedReceipt>> {
            self.inner.list_for_order(order_id)
        }

        fn last_order_receipts(&self) -> PrintLogResult<Vec<PrintedReceipt>> {
            self.inner.last_order_receipts()
        }

        fn purge_older_than(&self, cutoff: DateTime<Utc>) -> PrintLogResult<usize> {
            self.inner.purge_older_than(cutoff)
        }

        fn stats(&self) -> PrintLogResult<PrintLogStats> {
            self.inner.stats()
        }
    }

    fn printer(id: i64, host: &str, enabled: bool) -> Printer {
        Printer {
            id,
            name: format!("printer-{id}"),
            host: host.into(),
            port: 9100,
            enabled,
            width_chars: 32,
            logo_path: None,
        }
    }

    fn rule(id: i64, mode: RuleMode, priority: i32, printer_id: i64) -> ReceiptRule {
        ReceiptRule {
            id,
            name: format!("rule-{id}"),
            mode,
            kitchen_id: None,
            printer_id: Some(printer_id),
            template_id: Some(1),
            copies: 1,
            priority,
            consume_lines: true,
            enabled: true,
            product_ids: vec![],
        }
    }

    fn seed(rules: Vec<ReceiptRule>) -> CatalogSeed {
        CatalogSeed {
            kitchens: vec![Kitchen {
                id: 1,
                name: "Pizzeria".into(),
                prefix: "PIZ".into(),
                next_seq: 1,
            }],
            products: vec![
                Product {
                    id: 100,
                    name: "Margherita".into(),
                    price_cents: 700,
                    kitchen_id: Some(1),
                    category_id: None,
                },
                Product {
                    id: 200,
                    name: "Birra".into(),
                    price_cents: 400,
                    kitchen_id: None,
                    category_id: None,
                },
            ],
            printers: vec![printer(1, "up", true), printer(2, "down", true), printer(3, "up", false)],
            templates: vec![ReceiptTemplate {
                id: 1,
                name: "default".into(),
                body: "{{rule.name}}\n{{#each lines}}{{qty}} {{name}}\n{{/each}}".into(),
                cut: true,
            }],
            rules,
            ..Default::default()
        }
    }

    struct Fixture {
        engine: ReceiptRoutingEngine,
        dispatcher: Arc<RecordingDispatcher>,
        order_id: i64,
    }

    async fn fixture(rules: Vec<ReceiptRule>) -> Fixture {
        fixture_with_log(rules, Arc::new(PrintLog::open_in_memory().unwrap())).await
    }

    async fn fixture_with_log(rules: Vec<ReceiptRule>, log: Arc<dyn ReceiptLog>) -> Fixture {
        let seed = seed(rules);
        let store = Arc::new(OrderStore::open_in_memory(&seed.kitchens).unwrap());
        let catalog = Arc::new(Catalog::from_seed(seed).unwrap());

        let mut txn = store.begin_checkout(&[1]).await;
        let seq = txn.reserve_next(1).unwrap();
        txn.insert_order("cash", 1800);
        for (product_id, name, qty, kitchen_id) in
            [(100, "Margherita", 2, Some(1)), (200, "Birra", 1, None)]
        {
            txn.insert_line(OrderLine {
                id: 0,
                order_id: 0,
                product_id,
                name: name.into(),
                qty,
                unit_price_cents: 700,
                kitchen_id,
                pickup_seq: kitchen_id.map(|_| seq),
                notes: None,
                options: vec![],
            })
            .unwrap();
        }
        txn.insert_ticket(1).unwrap();
        let order = txn.commit().unwrap();

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = ReceiptRoutingEngine::new(
            catalog,
            store,
            log,
            Arc::new(HandlebarsRenderer::new()),
            dispatcher.clone(),
        );
        Fixture {
            engine,
            dispatcher,
            order_id: order.id,
        }
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("\n  \n  [[C]]PIZ-4  \nmore"), "[[C]]PIZ-4");
        assert_eq!(summarize(""), "");
        assert_eq!(summarize(&"x".repeat(300)).len(), 120);
    }

    #[tokio::test]
    async fn test_consumed_lines_skip_later_rules() {
        let mut kds = rule(1, RuleMode::Kds, 10, 1);
        kds.kitchen_id = Some(1);
        let mut all = rule(2, RuleMode::ProductSet, 20, 1);
        all.product_ids = vec![100, 200];

        let f = fixture(vec![all, kds]).await;
        let attempts = f.engine.route(f.order_id).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].rule_id, 1);
        assert_eq!(attempts[1].rule_id, 2);

        let calls = f.dispatcher.calls.lock();
        assert_eq!(calls[0].1, "rule-1\n2 Margherita\n");
        assert_eq!(calls[1].1, "rule-2\n1 Birra\n");
        assert!(calls[0].2);
    }

    #[tokio::test]
    async fn test_non_consuming_rule_leaves_lines() {
        let mut copy = rule(1, RuleMode::ProductSet, 10, 1);
        copy.product_ids = vec![100];
        copy.consume_lines = false;
        let mut kds = rule(2, RuleMode::Kds, 20, 1);
        kds.kitchen_id = Some(1);

        let f = fixture(vec![copy, kds]).await;
        f.engine.route(f.order_id).await.unwrap();
        let calls = f.dispatcher.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1, "rule-2\n2 Margherita\n");
    }

    #[tokio::test]
    async fn test_copies_and_failures_are_logged() {
        let mut kds = rule(1, RuleMode::Kds, 10, 2);
        kds.kitchen_id = Some(1);
        kds.copies = 2;
        let mut disabled = rule(2, RuleMode::ProductSet, 20, 3);
        disabled.product_ids = vec![200];

        let f = fixture(vec![kds, disabled]).await;
        let attempts = f.engine.route(f.order_id).await.unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].copy, 1);
        assert_eq!(attempts[1].copy, 2);
        assert!(attempts.iter().all(|a| a.status == PrintStatus::Error));
        assert_eq!(attempts[2].error.as_deref(), Some(PRINTER_UNAVAILABLE));

        // the disabled printer is never contacted
        assert_eq!(f.dispatcher.calls.lock().len(), 2);

        let rows = f.engine.receipts_for_order(f.order_id).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].kitchen_id, Some(1));
        assert_eq!(rows[2].kitchen_id, None);
        assert_eq!(rows[0].summary, "rule-1");
    }

    #[tokio::test]
    async fn test_skipped_rules_leave_no_rows() {
        let mut unknown = rule(1, RuleMode::Unrecognized, 1, 1);
        unknown.product_ids = vec![100];
        let mut no_template = rule(2, RuleMode::ProductSet, 2, 1);
        no_template.product_ids = vec![100];
        no_template.template_id = Some(99);
        let mut no_match = rule(3, RuleMode::ProductSet, 3, 1);
        no_match.product_ids = vec![555];

        let f = fixture(vec![unknown, no_template, no_match]).await;
        assert!(f.engine.route(f.order_id).await.unwrap().is_empty());
        assert!(f.engine.receipts_for_order(f.order_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let f = fixture(vec![]).await;
        let err = f.engine.route(999).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn test_reprint() {
        let mut kds = rule(1, RuleMode::Kds, 10, 1);
        kds.kitchen_id = Some(1);
        let mut bar = rule(2, RuleMode::ProductSet, 20, 2);
        bar.product_ids = vec![200];

        let f = fixture(vec![kds, bar]).await;
        let attempts = f.engine.route(f.order_id).await.unwrap();

        let row = f
            .engine
            .reprint_receipt(attempts[0].receipt_id.unwrap())
            .await
            .unwrap();
        assert_eq!(row.rule_id, 1);

        let err = f
            .engine
            .reprint_receipt(attempts[1].receipt_id.unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PrintFailed);

        let err = f.engine.reprint_receipt(999).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PrintLogNotFound);

        let summary = f.engine.reprint_order(f.order_id).await.unwrap();
        assert_eq!(summary, ReprintSummary { reprinted: 1, failed: 1 });

        // reprints do not grow the log
        assert_eq!(f.engine.receipts_for_order(f.order_id).unwrap().len(), 2);

        let err = f.engine.reprint_order(999).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_stop_routing() {
        let mut kds = rule(1, RuleMode::Kds, 10, 1);
        kds.kitchen_id = Some(1);
        kds.copies = 2;
        let mut bar = rule(2, RuleMode::ProductSet, 20, 1);
        bar.product_ids = vec![200];

        let log = Arc::new(FailingLog {
            inner: PrintLog::open_in_memory().unwrap(),
            failing_rule: 1,
        });
        let f = fixture_with_log(vec![kds, bar], log).await;
        let attempts = f.engine.route(f.order_id).await.unwrap();

        // both copies of rule 1 printed but went unlogged; rule 2 still ran
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].receipt_id, None);
        assert_eq!(attempts[1].copy, 2);
        assert_eq!(attempts[1].status, PrintStatus::Ok);
        assert_eq!(attempts[2].rule_id, 2);
        assert!(attempts[2].receipt_id.is_some());
        assert_eq!(f.dispatcher.calls.lock().len(), 3);

        let rows = f.engine.receipts_for_order(f.order_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rule_id, 2);
    }
}
