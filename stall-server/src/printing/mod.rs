//! Receipt Routing Module
//!
//! Decides what gets printed where after a checkout:
//! - [`engine`]: rule matching, line consumption, per-copy dispatch and logging
//! - [`context`]: the data a receipt template sees
//! - [`renderer`]: template rendering (handlebars)

pub mod context;
pub mod engine;
pub mod renderer;

pub use context::ReceiptContext;
pub use engine::{ReceiptRoutingEngine, summarize};
pub use renderer::{HandlebarsRenderer, RenderError, TemplateRenderer};
