//! End-to-end checkout: pickup numbers, routing to real sockets, tickets

mod common;

use common::*;
use shared::error::ErrorCode;
use shared::models::{CartLine, CartOption, CheckoutRequest, PrintStatus, TicketStatus};
use stall_server::KitchenEvent;

fn line(product_id: i64, qty: i64) -> CartLine {
    CartLine {
        product_id,
        qty,
        unit_price_cents: None,
        options: vec![],
        notes: None,
    }
}

fn request(lines: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        paid_method: "card".into(),
        lines,
    }
}

#[tokio::test]
async fn test_checkout_routes_to_printers() {
    let down = closed_port().await;
    let (up, received) = fake_printer(1).await;

    let state = state(seed(
        vec![printer(1, down), printer(2, up)],
        vec![
            kds_rule(1, PIZZERIA, 1, 10),
            product_rule(2, &[MARGHERITA, TIRAMISU], 2, 20),
        ],
    ));

    let receipt = state
        .checkout
        .checkout(request(vec![line(MARGHERITA, 2), line(TIRAMISU, 1)]))
        .await
        .unwrap();

    assert_eq!(receipt.total_cents, 2 * 700 + 400);
    assert_eq!(receipt.pickup_numbers, vec!["PIZ-1".to_string()]);

    // Kitchen rule failed on the closed port but still claimed the pizza
    assert_eq!(receipt.prints.len(), 2);
    assert_eq!(receipt.prints[0].rule_id, 1);
    assert_eq!(receipt.prints[0].status, PrintStatus::Error);
    assert!(receipt.prints[0].error.is_some());
    assert_eq!(receipt.prints[1].rule_id, 2);
    assert_eq!(receipt.prints[1].status, PrintStatus::Ok);

    let sent = received.await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(&sent[0][..2], &[0x1B, 0x40]);
    assert!(contains(&sent[0], b"Tiramisu"));
    assert!(!contains(&sent[0], b"Margherita"));

    let rows = state.engine.receipts_for_order(receipt.order_id).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].body.contains("PIZ-1"));
    assert!(rows[0].body.contains("2x Margherita"));
    assert_eq!(rows[0].kitchen_id, Some(PIZZERIA));
    assert!(rows[1].body.contains("1x Tiramisu"));
    assert_eq!(rows[1].status, PrintStatus::Ok);
}

#[tokio::test]
async fn test_concurrent_checkouts_get_distinct_numbers() {
    let state = state(seed(vec![], vec![]));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .checkout
                .checkout(request(vec![line(DIAVOLA, 1)]))
                .await
                .unwrap()
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        let receipt = handle.await.unwrap();
        assert!(receipt.prints.is_empty());
        numbers.extend(receipt.pickup_numbers);
    }
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 20);
    assert!(numbers.contains(&"PIZ-1".to_string()));
    assert!(numbers.contains(&"PIZ-20".to_string()));
    assert_eq!(state.store.next_seq(PIZZERIA).await, 21);
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let state = state(seed(vec![], vec![]));

    let err = state
        .checkout
        .checkout(request(vec![line(999, 1), line(DIAVOLA, 0)]))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::OrderEmpty);
    assert_eq!(state.store.next_seq(PIZZERIA).await, 1);
}

#[tokio::test]
async fn test_overflowing_total_is_rejected() {
    let state = state(seed(vec![], vec![]));

    let mut huge = line(MARGHERITA, i64::MAX / 2);
    huge.unit_price_cents = Some(10);
    let err = state
        .checkout
        .checkout(request(vec![huge]))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationFailed);
    assert_eq!(state.store.next_seq(PIZZERIA).await, 1);
    assert!(state.store.open_tickets(PIZZERIA).unwrap().is_empty());
}

#[tokio::test]
async fn test_restart_resumes_orders_and_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let (port, received) = fake_printer(2).await;
    let rules = vec![product_rule(1, &[MARGHERITA], 1, 10)];

    let first = {
        let state = boot(dir.path(), seed(vec![printer(1, port)], rules.clone()));
        state
            .checkout
            .checkout(request(vec![line(MARGHERITA, 1)]))
            .await
            .unwrap()
    };
    assert_eq!(first.pickup_numbers, vec!["PIZ-1".to_string()]);

    let state = boot(dir.path(), seed(vec![printer(1, port)], rules));
    let second = state
        .checkout
        .checkout(request(vec![line(MARGHERITA, 2)]))
        .await
        .unwrap();
    received.await.unwrap();

    assert_eq!(second.order_id, first.order_id + 1);
    assert_eq!(second.pickup_numbers, vec!["PIZ-2".to_string()]);

    // each order keeps only its own receipts across the restart
    let rows = state.engine.receipts_for_order(second.order_id).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].body.contains("2x Margherita"));
    assert_eq!(state.engine.receipts_for_order(first.order_id).unwrap().len(), 1);
    assert_eq!(
        state.engine.last_order_receipts().unwrap()[0].order_id,
        second.order_id
    );
    assert_eq!(state.tickets.board("PIZ").unwrap().len(), 2);
}

#[tokio::test]
async fn test_multi_kitchen_order() {
    let state = state(seed(vec![], vec![]));

    let receipt = state
        .checkout
        .checkout(request(vec![line(SPRITZ, 2), line(DIAVOLA, 1), line(TIRAMISU, 1)]))
        .await
        .unwrap();

    assert_eq!(
        receipt.pickup_numbers,
        vec!["PIZ-1".to_string(), "BAR-50".to_string()]
    );
    let tickets = state.store.tickets_for_order(receipt.order_id).unwrap();
    assert_eq!(tickets.len(), 2);
    assert!(tickets.iter().all(|t| t.status == TicketStatus::Queued));
    assert_eq!(state.store.next_seq(BAR).await, 51);
}

#[tokio::test]
async fn test_disabled_rule_is_skipped() {
    let (port, received) = fake_printer(1).await;
    let state = state(seed(
        vec![printer(1, port)],
        vec![product_rule(7, &[TIRAMISU], 1, 10)],
    ));

    state.catalog.set_rule_enabled(7, false).unwrap();
    let receipt = state
        .checkout
        .checkout(request(vec![line(TIRAMISU, 1)]))
        .await
        .unwrap();
    assert!(receipt.prints.is_empty());
    assert!(receipt.pickup_numbers.is_empty());

    state.catalog.set_rule_enabled(7, true).unwrap();
    let receipt = state
        .checkout
        .checkout(request(vec![line(TIRAMISU, 3)]))
        .await
        .unwrap();
    assert_eq!(receipt.prints.len(), 1);
    assert_eq!(receipt.prints[0].status, PrintStatus::Ok);

    let sent = received.await.unwrap();
    assert!(contains(&sent[0], b"3x Tiramisu"));
}

#[tokio::test]
async fn test_reprint_order_is_not_logged() {
    let (port, received) = fake_printer(2).await;
    let state = state(seed(
        vec![printer(1, port)],
        vec![product_rule(1, &[SPRITZ], 1, 10)],
    ));

    let receipt = state
        .checkout
        .checkout(request(vec![line(SPRITZ, 1)]))
        .await
        .unwrap();
    let summary = state.engine.reprint_order(receipt.order_id).await.unwrap();
    assert_eq!(summary.reprinted, 1);
    assert_eq!(summary.failed, 0);

    let sent = received.await.unwrap();
    assert_eq!(sent[0], sent[1]);
    assert_eq!(state.engine.receipts_for_order(receipt.order_id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_ticket_lifecycle_and_events() {
    let state = state(seed(vec![], vec![]));
    let mut events = state.bus.subscribe();

    state
        .checkout
        .checkout(request(vec![line(DIAVOLA, 1)]))
        .await
        .unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        KitchenEvent::TicketsCreated {
            kitchens: vec!["PIZ".into()]
        }
    );

    let ticket = state.tickets.advance("piz", 1, TicketStatus::Prepping).unwrap();
    assert_eq!(ticket.status, TicketStatus::Prepping);
    assert_eq!(
        events.recv().await.unwrap(),
        KitchenEvent::TicketUpdate {
            prefix: "PIZ".into(),
            seq: 1,
            status: TicketStatus::Prepping
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        KitchenEvent::DisplayRefresh {
            prefix: "PIZ".into()
        }
    );

    state.tickets.advance("PIZ", 1, TicketStatus::Delivered).unwrap();
    assert_eq!(events.recv().await.unwrap().name(), "ticket_update");
    assert_eq!(
        events.recv().await.unwrap(),
        KitchenEvent::TicketDelivered {
            prefix: "PIZ".into(),
            seq: 1
        }
    );

    let err = state
        .tickets
        .advance("PIZ", 1, TicketStatus::Ready)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TicketAlreadyDelivered);
    assert_eq!(
        state.store.ticket(ticket.id).unwrap().unwrap().status,
        TicketStatus::Delivered
    );
    assert!(events.try_recv().is_err());

    let err = state
        .tickets
        .advance("PIZ", 42, TicketStatus::Ready)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TicketNotFound);
}

#[tokio::test]
async fn test_kitchen_board() {
    let state = state(seed(vec![], vec![]));

    let mut diavola = line(DIAVOLA, 2);
    diavola.options = vec![CartOption {
        name: "Impasto".into(),
        value: "integrale".into(),
        delta: 100,
    }];
    diavola.notes = Some("ben cotta".into());
    let receipt = state
        .checkout
        .checkout(request(vec![diavola, line(SPRITZ, 1)]))
        .await
        .unwrap();
    assert_eq!(receipt.total_cents, 2 * 950 + 500);

    let board = state.tickets.board("PIZ").unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].seq, 1);
    assert_eq!(board[0].order_id, receipt.order_id);
    assert_eq!(board[0].items.len(), 1);
    assert_eq!(board[0].items[0].name, "Diavola");
    assert_eq!(board[0].items[0].qty, 2);
    assert_eq!(board[0].items[0].options[0].value, "integrale");
    assert_eq!(board[0].items[0].notes.as_deref(), Some("ben cotta"));

    let bar = state.tickets.board("bar").unwrap();
    assert_eq!(bar[0].seq, 50);
    assert_eq!(bar[0].items[0].name, "Spritz");

    state.tickets.advance("PIZ", 1, TicketStatus::Delivered).unwrap();
    assert!(state.tickets.board("PIZ").unwrap().is_empty());

    let err = state.tickets.board("XYZ").unwrap_err();
    assert_eq!(err.code, ErrorCode::KitchenNotFound);
}
