//! redb-based print log
//!
//! One row per print attempt. Rows are append-only; only
//! [`ReceiptLog::purge_older_than`] removes them.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use shared::error::AppError;
use shared::models::{PrintStatus, PrintedReceipt};
use thiserror::Error;

/// Receipts table: key = receipt id, value = JSON
const RECEIPTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("printed_receipts");

/// Index: (order_id, receipt_id) -> ()
const RECEIPTS_BY_ORDER_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("printed_receipts_by_order");

/// Counters
const META_TABLE: TableDefinition<&str, i64> = TableDefinition::new("meta");
const LAST_ID_KEY: &str = "last_receipt_id";

#[derive(Debug, Error)]
pub enum PrintLogError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PrintLogResult<T> = Result<T, PrintLogError>;

impl From<PrintLogError> for AppError {
    fn from(err: PrintLogError) -> Self {
        tracing::error!(error = %err, "Print log failure");
        AppError::database(err.to_string())
    }
}

/// Print attempt to append
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub order_id: i64,
    pub rule_id: i64,
    pub template_id: i64,
    pub printer_id: i64,
    pub kitchen_id: Option<i64>,
    pub body: String,
    pub cut: bool,
    pub status: PrintStatus,
    pub error_text: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct PrintLogStats {
    pub receipt_count: u64,
    pub order_count: u64,
}

/// Append-only record of print attempts
pub trait ReceiptLog: Send + Sync {
    /// Append a print attempt, assigning the next receipt id
    fn append(&self, receipt: NewReceipt) -> PrintLogResult<PrintedReceipt>;

    fn get(&self, id: i64) -> PrintLogResult<Option<PrintedReceipt>>;

    /// Receipts of an order, in log order
    fn list_for_order(&self, order_id: i64) -> PrintLogResult<Vec<PrintedReceipt>>;

    /// Receipts of the most recently printed order
    fn last_order_receipts(&self) -> PrintLogResult<Vec<PrintedReceipt>>;

    /// Delete receipts created before `cutoff`
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> PrintLogResult<usize>;

    fn stats(&self) -> PrintLogResult<PrintLogStats>;
}

#[derive(Clone)]
pub struct PrintLog {
    db: Arc<Database>,
}

impl std::fmt::Debug for PrintLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintLog").finish_non_exhaustive()
    }
}

impl PrintLog {
    /// Open or create the database
    pub fn open(path: impl AsRef<Path>) -> PrintLogResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> PrintLogResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> PrintLogResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECEIPTS_TABLE)?;
            let _ = write_txn.open_table(RECEIPTS_BY_ORDER_TABLE)?;
            let _ = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Order of the most recently logged receipt
    pub fn last_order_id(&self) -> PrintLogResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECEIPTS_TABLE)?;

        match table.last()? {
            Some((_, guard)) => {
                let row: PrintedReceipt = serde_json::from_slice(guard.value())?;
                Ok(Some(row.order_id))
            }
            None => Ok(None),
        }
    }
}

impl ReceiptLog for PrintLog {
    fn append(&self, receipt: NewReceipt) -> PrintLogResult<PrintedReceipt> {
        let txn = self.db.begin_write()?;
        let row = {
            let mut meta = txn.open_table(META_TABLE)?;
            let id = meta.get(LAST_ID_KEY)?.map(|g| g.value()).unwrap_or(0) + 1;
            meta.insert(LAST_ID_KEY, id)?;

            let row = PrintedReceipt {
                id,
                created_at: Utc::now(),
                order_id: receipt.order_id,
                rule_id: receipt.rule_id,
                template_id: receipt.template_id,
                printer_id: receipt.printer_id,
                kitchen_id: receipt.kitchen_id,
                body: receipt.body,
                cut: receipt.cut,
                status: receipt.status,
                error_text: receipt.error_text,
                summary: receipt.summary,
            };

            let mut table = txn.open_table(RECEIPTS_TABLE)?;
            let value = serde_json::to_vec(&row)?;
            table.insert(id, value.as_slice())?;

            let mut idx_table = txn.open_table(RECEIPTS_BY_ORDER_TABLE)?;
            idx_table.insert((row.order_id, id), ())?;
            row
        };
        txn.commit()?;

        tracing::debug!(
            receipt_id = row.id,
            order_id = row.order_id,
            rule_id = row.rule_id,
            status = ?row.status,
            "Print attempt logged"
        );
        Ok(row)
    }

    fn get(&self, id: i64) -> PrintLogResult<Option<PrintedReceipt>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECEIPTS_TABLE)?;

        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn list_for_order(&self, order_id: i64) -> PrintLogResult<Vec<PrintedReceipt>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(RECEIPTS_BY_ORDER_TABLE)?;
        let data_table = read_txn.open_table(RECEIPTS_TABLE)?;

        let mut receipts = Vec::new();
        for result in idx_table.range((order_id, i64::MIN)..=(order_id, i64::MAX))? {
            let (key, _) = result?;
            let (_, receipt_id) = key.value();
            if let Some(guard) = data_table.get(receipt_id)? {
                receipts.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(receipts)
    }

    fn last_order_receipts(&self) -> PrintLogResult<Vec<PrintedReceipt>> {
        match self.last_order_id()? {
            Some(order_id) => self.list_for_order(order_id),
            None => Ok(Vec::new()),
        }
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> PrintLogResult<usize> {
        let txn = self.db.begin_write()?;
        let deleted = {
            let mut table = txn.open_table(RECEIPTS_TABLE)?;
            let mut idx_table = txn.open_table(RECEIPTS_BY_ORDER_TABLE)?;

            let mut to_delete = Vec::new();
            for result in table.iter()? {
                let (key, guard) = result?;
                let row: PrintedReceipt = serde_json::from_slice(guard.value())?;
                if row.created_at < cutoff {
                    to_delete.push((key.value(), row.order_id));
                }
            }

            for (id, order_id) in &to_delete {
                table.remove(*id)?;
                idx_table.remove((*order_id, *id))?;
            }
            to_delete.len()
        };
        txn.commit()?;

        if deleted > 0 {
            tracing::info!(deleted, cutoff = %cutoff, "Print log purged");
        }
        Ok(deleted)
    }

    fn stats(&self) -> PrintLogResult<PrintLogStats> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECEIPTS_TABLE)?;
        let idx_table = read_txn.open_table(RECEIPTS_BY_ORDER_TABLE)?;

        let mut order_count = 0;
        let mut last_order = None;
        for result in idx_table.iter()? {
            let (key, _) = result?;
            let (order_id, _) = key.value();
            if last_order != Some(order_id) {
                order_count += 1;
                last_order = Some(order_id);
            }
        }

        Ok(PrintLogStats {
            receipt_count: table.len()?,
            order_count,
        })
    }
}
