use std::path::PathBuf;
use std::sync::Arc;

use stall_printer::{Dispatch, PrintDispatcher};

use crate::core::{Config, Result};
use crate::db::{Catalog, OrderStore, PrintLog, ReceiptLog};
use crate::message::EventBus;
use crate::orders::CheckoutService;
use crate::printing::{HandlebarsRenderer, ReceiptRoutingEngine};
use crate::tickets::TicketService;

/// Server state: shared handles to every service
///
/// Cheap to clone; everything inside is reference counted.
///
/// | Field | Role |
/// |-------|------|
/// | config | configuration (immutable) |
/// | catalog | kitchens, products, printers, templates, rules |
/// | store | orders, lines, tickets, pickup counters |
/// | bus | kitchen display events |
/// | engine | receipt routing and print log |
/// | checkout | cart -> order + tickets + receipts |
/// | tickets | ticket transitions and kitchen board |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub catalog: Arc<Catalog>,
    pub store: Arc<OrderStore>,
    pub bus: EventBus,
    pub engine: Arc<ReceiptRoutingEngine>,
    pub checkout: CheckoutService,
    pub tickets: TicketService,
}

impl ServerState {
    /// Wire the services together
    pub fn new(
        config: Config,
        catalog: Catalog,
        store: OrderStore,
        print_log: Arc<dyn ReceiptLog>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let store = Arc::new(store);
        let bus = EventBus::with_capacity(config.event_bus_capacity);

        let engine = Arc::new(
            ReceiptRoutingEngine::new(
                catalog.clone(),
                store.clone(),
                print_log,
                Arc::new(HandlebarsRenderer::new()),
                dispatcher,
            )
            .with_event_name(config.event_name.clone())
            .with_timezone(config.timezone),
        );
        let checkout =
            CheckoutService::new(catalog.clone(), store.clone(), engine.clone(), bus.clone());
        let tickets = TicketService::new(catalog.clone(), store.clone(), bus.clone());

        Self {
            config,
            catalog,
            store,
            bus,
            engine,
            checkout,
            tickets,
        }
    }

    /// Initialize from configuration
    ///
    /// 1. work dir
    /// 2. catalog seed (`CATALOG_PATH`)
    /// 3. order store (work_dir/orders.redb), counters seeded from the catalog
    /// 4. print log (work_dir/print_log.redb)
    /// 5. network dispatcher with the configured connect timeout
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let catalog = Catalog::load(config.catalog_path())?;
        let store = OrderStore::open(config.order_store_path(), &catalog.kitchens())?;
        let print_log = Arc::new(PrintLog::open(config.print_log_path())?);
        let dispatcher = Arc::new(PrintDispatcher::new(config.printer_connect_timeout()));

        tracing::info!(
            work_dir = %config.work_dir,
            catalog = %config.catalog_path().display(),
            "Server state initialized"
        );
        Ok(Self::new(
            config.clone(),
            catalog,
            store,
            print_log,
            dispatcher,
        ))
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
