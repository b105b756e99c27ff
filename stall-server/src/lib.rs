//! Stall Server - order fulfillment and receipt routing for a food stall POS
//!
//! # Overview
//!
//! - **Checkout** (`orders`): cart -> order, per-kitchen pickup numbers, tickets
//! - **Receipt routing** (`printing`): priority-ordered rules pick printer + template per line set
//! - **Tickets** (`tickets`): kitchen display state machine and board
//! - **Storage** (`db`): catalog seed, redb order store, redb print log
//! - **Events** (`message`): broadcast of kitchen display events
//! - **HTTP API** (`api`)
//!
//! ESC/POS encoding and printer I/O live in the `stall-printer` crate.
//!
//! # Layout
//!
//! ```text
//! stall-server/src/
//! ├── core/          # config, state, server, errors
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # catalog, order store, print log
//! ├── orders/        # checkout
//! ├── printing/      # routing engine, template context, renderer
//! ├── tickets/       # state machine, kitchen board
//! ├── message/       # event bus
//! └── utils/         # logging, error re-exports
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod message;
pub mod orders;
pub mod printing;
pub mod tickets;
pub mod utils;

pub use core::{Config, Server, ServerState};
pub use message::{EventBus, KitchenEvent};
pub use utils::{AppError, AppResult};

pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env` and install the logger
///
/// Reads `LOG_LEVEL` and `LOG_DIR` directly so startup messages from
/// [`Config::from_env`] are already captured.
pub fn setup_environment() {
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    if let Some(dir) = &log_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Cannot create log dir {dir}: {e}");
    }
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
   _____ __        ____
  / ___// /_____ _/ / /
  \__ \/ __/ __ `/ / /
 ___/ / /_/ /_/ / / /
/____/\__/\__,_/_/_/
    "#
    );
}
