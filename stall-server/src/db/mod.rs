//! Storage Module
//!
//! - [`catalog`]: kitchens, products, printers, templates and rules (JSON seed)
//! - [`store`]: redb orders, lines, tickets and the per-kitchen ticket sequencer
//! - [`print_log`]: redb print attempt log

pub mod catalog;
pub mod print_log;
pub mod store;

pub use catalog::{Catalog, CatalogError, CatalogSeed};
pub use print_log::{
    NewReceipt, PrintLog, PrintLogError, PrintLogResult, PrintLogStats, ReceiptLog,
};
pub use store::{CheckoutTxn, MAX_PICKUP_SEQ, OrderStore, StoreError, StoreResult};
