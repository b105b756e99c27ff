//! Data models
//!
//! Shared between stall-server and its HTTP clients.
//! All IDs are `i64`, all amounts are integer cents.

pub mod kitchen;
pub mod order;
pub mod receipt;
pub mod ticket;

// Re-exports
pub use kitchen::*;
pub use order::*;
pub use receipt::*;
pub use ticket::*;
