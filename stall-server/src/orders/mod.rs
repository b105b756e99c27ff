//! Orders
//!
//! Checkout is the only way orders come into existence; see [`checkout`].

pub mod checkout;

pub use checkout::CheckoutService;
