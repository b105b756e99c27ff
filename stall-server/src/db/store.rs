//! Order store and ticket sequencer
//!
//! Orders, lines, tickets and pickup counters persist in redb, so numbering
//! resumes where it stopped after a restart. Each kitchen counter is mirrored
//! behind its own async mutex: a checkout locks the counters of the kitchens it
//! touches (ascending id) for its whole unit of work, so checkouts on disjoint
//! kitchens never wait on each other for numbering. redb admits one writer at a
//! time; commits are short and never span an await.
//!
//! Nothing a [`CheckoutTxn`] stages is visible until [`CheckoutTxn::commit`]
//! writes it in one redb transaction; dropping the transaction releases the
//! locks and consumes no number.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::error::AppError;
use shared::models::{Kitchen, Order, OrderLine, Ticket, TicketStatus};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Orders table: key = order id, value = JSON
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Lines table: key = order id, value = JSON array of the order's lines
const LINES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("order_lines");

/// Tickets table: key = ticket id, value = JSON
const TICKETS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("tickets");

/// Index: (kitchen_id, pickup_seq) -> latest ticket id
const TICKETS_BY_SEQ_TABLE: TableDefinition<(i64, i64), i64> =
    TableDefinition::new("tickets_by_seq");

/// kitchen_id -> next pickup number
const SEQUENCE_TABLE: TableDefinition<i64, i64> = TableDefinition::new("kitchen_next_seq");

/// Highest id handed out per row kind
const META_TABLE: TableDefinition<&str, i64> = TableDefinition::new("meta");
const LAST_ORDER_ID_KEY: &str = "last_order_id";
const LAST_LINE_ID_KEY: &str = "last_line_id";
const LAST_TICKET_ID_KEY: &str = "last_ticket_id";

/// Largest pickup number a kitchen counter may hand out
pub const MAX_PICKUP_SEQ: i64 = 999_999_999;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Kitchen {0} is not part of this checkout")]
    KitchenNotLocked(i64),

    #[error("No pickup number reserved for kitchen {0}")]
    NotReserved(i64),

    #[error("Order must be staged before its lines")]
    NoOrder,

    #[error("Pickup numbers exhausted for kitchen {0}; reset its counter")]
    SequenceExhausted(i64),

    #[error("Pickup number {0} is outside 1..={max}", max = MAX_PICKUP_SEQ)]
    SeqOutOfRange(i64),

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

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SequenceExhausted(kitchen_id) => {
                AppError::validation(err.to_string()).with_detail("kitchen_id", kitchen_id)
            }
            StoreError::SeqOutOfRange(value) => {
                AppError::validation(err.to_string()).with_detail("next_seq", value)
            }
            StoreError::KitchenNotLocked(_) | StoreError::NotReserved(_) | StoreError::NoOrder => {
                AppError::internal(err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "Order store failure");
                AppError::database(err.to_string())
            }
        }
    }
}

pub struct OrderStore {
    db: Arc<Database>,
    /// kitchen_id -> next pickup number, mirrors SEQUENCE_TABLE
    counters: DashMap<i64, Arc<Mutex<i64>>>,
    next_order_id: AtomicI64,
    next_line_id: AtomicI64,
    next_ticket_id: AtomicI64,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("kitchens", &self.counters.len())
            .finish_non_exhaustive()
    }
}

impl OrderStore {
    /// Open or create the database
    ///
    /// Kitchens without a persisted counter start at their `next_seq`.
    pub fn open(path: impl AsRef<Path>, kitchens: &[Kitchen]) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, kitchens)
    }

    /// Open an in-memory database
    pub fn open_in_memory(kitchens: &[Kitchen]) -> StoreResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, kitchens)
    }

    fn init(db: Database, kitchens: &[Kitchen]) -> StoreResult<Self> {
        let counters = DashMap::new();
        let write_txn = db.begin_write()?;
        let (last_order, last_line, last_ticket) = {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(LINES_TABLE)?;
            let _ = write_txn.open_table(TICKETS_TABLE)?;
            let _ = write_txn.open_table(TICKETS_BY_SEQ_TABLE)?;

            let mut sequence = write_txn.open_table(SEQUENCE_TABLE)?;
            for k in kitchens {
                if sequence.get(k.id)?.is_none() {
                    sequence.insert(k.id, k.next_seq)?;
                }
            }
            for result in sequence.iter()? {
                let (kitchen_id, next) = result?;
                counters.insert(kitchen_id.value(), Arc::new(Mutex::new(next.value())));
            }

            let meta = write_txn.open_table(META_TABLE)?;
            let last_order = meta.get(LAST_ORDER_ID_KEY)?.map(|g| g.value()).unwrap_or(0);
            let last_line = meta.get(LAST_LINE_ID_KEY)?.map(|g| g.value()).unwrap_or(0);
            let last_ticket = meta.get(LAST_TICKET_ID_KEY)?.map(|g| g.value()).unwrap_or(0);
            (last_order, last_line, last_ticket)
        };
        write_txn.commit()?;

        tracing::debug!(
            kitchens = counters.len(),
            last_order,
            last_ticket,
            "Order store opened"
        );
        Ok(Self {
            db: Arc::new(db),
            counters,
            next_order_id: AtomicI64::new(last_order + 1),
            next_line_id: AtomicI64::new(last_line + 1),
            next_ticket_id: AtomicI64::new(last_ticket + 1),
        })
    }

    fn counter(&self, kitchen_id: i64) -> Arc<Mutex<i64>> {
        self.counters
            .entry(kitchen_id)
            .or_insert_with(|| Arc::new(Mutex::new(1)))
            .clone()
    }

    /// Open a checkout unit of work over `kitchen_ids`
    ///
    /// Waits for every involved kitchen counter. Locks are taken in ascending
    /// kitchen id order; duplicates are ignored.
    pub async fn begin_checkout(&self, kitchen_ids: &[i64]) -> CheckoutTxn<'_> {
        let mut ids = kitchen_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = BTreeMap::new();
        for id in ids {
            let guard = self.counter(id).lock_owned().await;
            guards.insert(id, guard);
        }

        CheckoutTxn {
            store: self,
            guards,
            reserved: BTreeMap::new(),
            order: None,
            lines: Vec::new(),
            tickets: Vec::new(),
        }
    }

    // ========== Reads ==========

    pub fn order(&self, id: i64) -> StoreResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Lines of an order in line id order
    pub fn lines(&self, order_id: i64) -> StoreResult<Vec<OrderLine>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINES_TABLE)?;

        match table.get(order_id)? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Ok(Vec::new()),
        }
    }

    pub fn ticket(&self, id: i64) -> StoreResult<Option<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS_TABLE)?;

        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Ticket holding `seq` in a kitchen; after a counter reset the newest wins
    pub fn ticket_by_seq(&self, kitchen_id: i64, seq: i64) -> StoreResult<Option<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(TICKETS_BY_SEQ_TABLE)?;
        let Some(id) = idx_table.get((kitchen_id, seq))?.map(|g| g.value()) else {
            return Ok(None);
        };

        let table = read_txn.open_table(TICKETS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn scan_tickets(&self, keep: impl Fn(&Ticket) -> bool) -> StoreResult<Vec<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS_TABLE)?;

        let mut tickets = Vec::new();
        for result in table.iter()? {
            let (_, guard) = result?;
            let ticket: Ticket = serde_json::from_slice(guard.value())?;
            if keep(&ticket) {
                tickets.push(ticket);
            }
        }
        Ok(tickets)
    }

    /// Non-delivered tickets of a kitchen ordered by pickup number
    pub fn open_tickets(&self, kitchen_id: i64) -> StoreResult<Vec<Ticket>> {
        let mut tickets =
            self.scan_tickets(|t| t.kitchen_id == kitchen_id && t.status.is_open())?;
        tickets.sort_by_key(|t| (t.pickup_seq, t.id));
        Ok(tickets)
    }

    pub fn tickets_for_order(&self, order_id: i64) -> StoreResult<Vec<Ticket>> {
        let mut tickets = self.scan_tickets(|t| t.order_id == order_id)?;
        tickets.sort_by_key(|t| t.kitchen_id);
        Ok(tickets)
    }

    // ========== Writes ==========

    /// Run `f` on a ticket and write it back in one transaction
    pub fn with_ticket_mut<R>(
        &self,
        id: i64,
        f: impl FnOnce(&mut Ticket) -> R,
    ) -> StoreResult<Option<R>> {
        let txn = self.db.begin_write()?;
        let result = {
            let mut table = txn.open_table(TICKETS_TABLE)?;
            let current: Option<Ticket> = match table.get(id)? {
                Some(guard) => Some(serde_json::from_slice(guard.value())?),
                None => None,
            };
            match current {
                Some(mut ticket) => {
                    let result = f(&mut ticket);
                    let value = serde_json::to_vec(&ticket)?;
                    table.insert(id, value.as_slice())?;
                    Some(result)
                }
                None => None,
            }
        };
        txn.commit()?;
        Ok(result)
    }

    /// Current counter value; waits for in-flight checkouts on the kitchen
    pub async fn next_seq(&self, kitchen_id: i64) -> i64 {
        *self.counter(kitchen_id).lock().await
    }

    /// Explicitly reset or align a kitchen counter
    pub async fn reset_next_seq(&self, kitchen_id: i64, value: i64) -> StoreResult<()> {
        if !(1..=MAX_PICKUP_SEQ).contains(&value) {
            return Err(StoreError::SeqOutOfRange(value));
        }

        let counter = self.counter(kitchen_id);
        let mut guard = counter.lock().await;
        let txn = self.db.begin_write()?;
        {
            let mut sequence = txn.open_table(SEQUENCE_TABLE)?;
            sequence.insert(kitchen_id, value)?;
        }
        txn.commit()?;

        tracing::info!(kitchen_id, from = *guard, to = value, "Pickup counter reset");
        *guard = value;
        Ok(())
    }
}

/// Checkout unit of work
///
/// Holds the counter locks of its kitchens until committed or dropped.
pub struct CheckoutTxn<'a> {
    store: &'a OrderStore,
    guards: BTreeMap<i64, OwnedMutexGuard<i64>>,
    reserved: BTreeMap<i64, i64>,
    order: Option<Order>,
    lines: Vec<OrderLine>,
    tickets: Vec<Ticket>,
}

impl CheckoutTxn<'_> {
    /// Pickup number for a locked kitchen
    ///
    /// Returns the counter's current value; repeated calls for the same kitchen
    /// return the same number. The counter only moves on commit.
    pub fn reserve_next(&mut self, kitchen_id: i64) -> StoreResult<i64> {
        if let Some(seq) = self.reserved.get(&kitchen_id) {
            return Ok(*seq);
        }
        let guard = self
            .guards
            .get(&kitchen_id)
            .ok_or(StoreError::KitchenNotLocked(kitchen_id))?;
        let seq = **guard;
        if !(1..=MAX_PICKUP_SEQ).contains(&seq) {
            return Err(StoreError::SequenceExhausted(kitchen_id));
        }
        self.reserved.insert(kitchen_id, seq);
        Ok(seq)
    }

    pub fn insert_order(&mut self, paid_method: &str, total_cents: i64) -> Order {
        let order = Order {
            id: self.store.next_order_id.fetch_add(1, Ordering::SeqCst),
            paid_method: paid_method.to_string(),
            total_cents,
            created_at: Utc::now(),
        };
        self.order = Some(order.clone());
        order
    }

    /// Stage a line; assigns its id and order id
    pub fn insert_line(&mut self, mut line: OrderLine) -> StoreResult<i64> {
        let order = self.order.as_ref().ok_or(StoreError::NoOrder)?;
        line.id = self.store.next_line_id.fetch_add(1, Ordering::SeqCst);
        line.order_id = order.id;
        let id = line.id;
        self.lines.push(line);
        Ok(id)
    }

    /// Stage a queued ticket carrying the kitchen's reserved number
    pub fn insert_ticket(&mut self, kitchen_id: i64) -> StoreResult<Ticket> {
        let order = self.order.as_ref().ok_or(StoreError::NoOrder)?;
        let seq = *self
            .reserved
            .get(&kitchen_id)
            .ok_or(StoreError::NotReserved(kitchen_id))?;
        let ticket = Ticket {
            id: self.store.next_ticket_id.fetch_add(1, Ordering::SeqCst),
            kitchen_id,
            order_id: order.id,
            pickup_seq: seq,
            status: TicketStatus::Queued,
            created_at: order.created_at,
        };
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    /// Write staged rows and advance every reserved counter by one
    ///
    /// Counters move only once redb has committed.
    pub fn commit(mut self) -> StoreResult<Order> {
        let order = self.order.take().ok_or(StoreError::NoOrder)?;

        let mut advanced = Vec::with_capacity(self.reserved.len());
        for (&kitchen_id, &seq) in &self.reserved {
            let next = seq
                .checked_add(1)
                .ok_or(StoreError::SequenceExhausted(kitchen_id))?;
            advanced.push((kitchen_id, next));
        }

        let txn = self.store.db.begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            orders.insert(order.id, serde_json::to_vec(&order)?.as_slice())?;

            let mut lines = txn.open_table(LINES_TABLE)?;
            lines.insert(order.id, serde_json::to_vec(&self.lines)?.as_slice())?;

            let mut tickets = txn.open_table(TICKETS_TABLE)?;
            let mut by_seq = txn.open_table(TICKETS_BY_SEQ_TABLE)?;
            for ticket in &self.tickets {
                tickets.insert(ticket.id, serde_json::to_vec(ticket)?.as_slice())?;
                by_seq.insert((ticket.kitchen_id, ticket.pickup_seq), ticket.id)?;
            }

            let mut sequence = txn.open_table(SEQUENCE_TABLE)?;
            for &(kitchen_id, next) in &advanced {
                sequence.insert(kitchen_id, next)?;
            }

            // ids are handed out before commit, so concurrent checkouts may land out of order
            let mut meta = txn.open_table(META_TABLE)?;
            let last_ids = [
                (LAST_ORDER_ID_KEY, Some(order.id)),
                (LAST_LINE_ID_KEY, self.lines.iter().map(|l| l.id).max()),
                (LAST_TICKET_ID_KEY, self.tickets.iter().map(|t| t.id).max()),
            ];
            for (key, id) in last_ids {
                let Some(id) = id else { continue };
                let last = meta.get(key)?.map(|g| g.value()).unwrap_or(0);
                if id > last {
                    meta.insert(key, id)?;
                }
            }
        }
        txn.commit()?;

        for (kitchen_id, next) in advanced {
            if let Some(guard) = self.guards.get_mut(&kitchen_id) {
                **guard = next;
            }
        }

        tracing::debug!(order_id = order.id, kitchens = ?self.reserved, "Checkout committed");
        Ok(order)
    }
}
