//! Kitchen tickets
//!
//! - [`machine`]: status transitions and the events they trigger
//! - [`service`]: staff actions and the kitchen board

pub mod machine;
pub mod service;

pub use machine::{TransitionError, transition};
pub use service::TicketService;
