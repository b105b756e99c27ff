//! # stall-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - Windows-1252 code page encoding
//! - Inline receipt markup (`[[C]]`, `[[BIG]]`, `[[LOGO:...]]`, ...)
//! - 1-bit raster images (GS v 0)
//! - Network printing (TCP port 9100) with a null-sink fallback
//!
//! WHAT to print (templates, routing rules, print log) stays in stall-server.
//!
//! ## Example
//!
//! ```ignore
//! use stall_printer::{Dispatch, PrintDispatcher};
//! use std::time::Duration;
//!
//! let dispatcher = PrintDispatcher::new(Duration::from_secs(5));
//! let outcome = dispatcher
//!     .dispatch("192.168.1.100", 9100, "[[C]][[BIG]]PIZ-12\nMargherita x2", true)
//!     .await;
//! if !outcome.ok {
//!     eprintln!("print failed: {:?}", outcome.error);
//! }
//! ```

mod dispatch;
mod encoder;
mod encoding;
mod error;
mod escpos;
mod markup;
mod printer;
mod raster;

// Re-exports
pub use dispatch::{Dispatch, DispatchOutcome, MAX_ERROR_LEN, PrintDispatcher, truncate_chars};
pub use encoder::ReceiptEncoder;
pub use encoding::{SELECT_CP1252, encode_text};
pub use error::{PrintError, PrintResult, RasterError, TagError};
pub use escpos::{Alignment, EscPosBuilder, Font, TextStyle, size_byte};
pub use markup::{ImageSpec, Tag, parse_tag, split_tags};
pub use printer::{MemorySink, NetworkPrinter, NetworkSink, NullSink, Sink};
pub use raster::{Background, RasterImage, RasterOptions, rasterize_file};

#[cfg(feature = "image")]
pub use raster::rasterize;
