#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use shared::models::{
    Category, Kitchen, Printer, Product, ReceiptRule, ReceiptTemplate, RuleMode,
};
use stall_printer::PrintDispatcher;
use stall_server::db::{Catalog, CatalogSeed, OrderStore, PrintLog};
use stall_server::{Config, ServerState};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const PIZZERIA: i64 = 1;
pub const BAR: i64 = 2;

pub const MARGHERITA: i64 = 100;
pub const DIAVOLA: i64 = 101;
pub const SPRITZ: i64 = 200;
pub const TIRAMISU: i64 = 300;

pub fn kitchens() -> Vec<Kitchen> {
    vec![
        Kitchen {
            id: PIZZERIA,
            name: "Pizzeria".into(),
            prefix: "PIZ".into(),
            next_seq: 1,
        },
        Kitchen {
            id: BAR,
            name: "Bar".into(),
            prefix: "BAR".into(),
            next_seq: 50,
        },
    ]
}

pub fn products() -> Vec<Product> {
    vec![
        Product {
            id: MARGHERITA,
            name: "Margherita".into(),
            price_cents: 700,
            kitchen_id: None,
            category_id: Some(10),
        },
        Product {
            id: DIAVOLA,
            name: "Diavola".into(),
            price_cents: 850,
            kitchen_id: Some(PIZZERIA),
            category_id: None,
        },
        Product {
            id: SPRITZ,
            name: "Spritz".into(),
            price_cents: 500,
            kitchen_id: Some(BAR),
            category_id: None,
        },
        Product {
            id: TIRAMISU,
            name: "Tiramisu".into(),
            price_cents: 400,
            kitchen_id: None,
            category_id: None,
        },
    ]
}

pub fn printer(id: i64, port: u16) -> Printer {
    Printer {
        id,
        name: format!("printer-{id}"),
        host: "127.0.0.1".into(),
        port,
        enabled: true,
        width_chars: 32,
        logo_path: None,
    }
}

pub fn template() -> ReceiptTemplate {
    ReceiptTemplate {
        id: 1,
        name: "ticket".into(),
        body: "[[C]][[B]]{{rule.name}} {{kitchen.prefix}}-{{kitchen.pickup_seq}}\n{{#each lines}}{{qty}}x {{name}}\n{{/each}}".into(),
        cut: true,
    }
}

pub fn kds_rule(id: i64, kitchen_id: i64, printer_id: i64, priority: i32) -> ReceiptRule {
    ReceiptRule {
        id,
        name: format!("kds-{id}"),
        mode: RuleMode::Kds,
        kitchen_id: Some(kitchen_id),
        printer_id: Some(printer_id),
        template_id: Some(1),
        copies: 1,
        priority,
        consume_lines: true,
        enabled: true,
        product_ids: vec![],
    }
}

pub fn product_rule(id: i64, products: &[i64], printer_id: i64, priority: i32) -> ReceiptRule {
    ReceiptRule {
        id,
        name: format!("set-{id}"),
        mode: RuleMode::ProductSet,
        kitchen_id: None,
        printer_id: Some(printer_id),
        template_id: Some(1),
        copies: 1,
        priority,
        consume_lines: true,
        enabled: true,
        product_ids: products.to_vec(),
    }
}

pub fn seed(printers: Vec<Printer>, rules: Vec<ReceiptRule>) -> CatalogSeed {
    CatalogSeed {
        kitchens: kitchens(),
        categories: vec![Category {
            id: 10,
            name: "Pizze".into(),
            kitchen_id: Some(PIZZERIA),
        }],
        products: products(),
        printers,
        templates: vec![template()],
        rules,
    }
}

fn dispatcher() -> Arc<PrintDispatcher> {
    Arc::new(PrintDispatcher::new(Duration::from_millis(500)))
}

/// State backed by in-memory databases and a real network dispatcher
pub fn state(seed: CatalogSeed) -> ServerState {
    let mut config = Config::with_overrides(std::env::temp_dir().display().to_string(), 0);
    config.event_name = "TEST".into();
    let catalog = Catalog::from_seed(seed).unwrap();
    let store = OrderStore::open_in_memory(&catalog.kitchens()).unwrap();
    ServerState::new(
        config,
        catalog,
        store,
        Arc::new(PrintLog::open_in_memory().unwrap()),
        dispatcher(),
    )
}

/// State whose databases live in `work_dir`, as after a real boot
pub fn boot(work_dir: &Path, seed: CatalogSeed) -> ServerState {
    let mut config = Config::with_overrides(work_dir.display().to_string(), 0);
    config.event_name = "TEST".into();
    let catalog = Catalog::from_seed(seed).unwrap();
    let store = OrderStore::open(config.order_store_path(), &catalog.kitchens()).unwrap();
    let print_log = PrintLog::open(config.print_log_path()).unwrap();
    ServerState::new(config, catalog, store, Arc::new(print_log), dispatcher())
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Fake printer: accepts `connections` connections and returns what each sent
pub async fn fake_printer(connections: usize) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let mut received = Vec::new();
        for _ in 0..connections {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.unwrap();
            received.push(buf);
        }
        received
    });
    (port, handle)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
