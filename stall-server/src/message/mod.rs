//! Kitchen display messaging
//!
//! The server only publishes; delivering events to display clients is up to
//! whoever subscribes to the [`EventBus`].

pub mod bus;

pub use bus::EventBus;
pub use shared::message::KitchenEvent;
