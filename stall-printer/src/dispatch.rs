//! Print dispatch with null-sink fallback
//!
//! A dispatch never raises: when the printer cannot be reached the receipt is
//! still run through the encoder into a [`NullSink`] and the failure is
//! reported in the outcome.

use crate::encoder::ReceiptEncoder;
use crate::printer::{NetworkPrinter, NullSink, Sink};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Longest error message kept in an outcome
pub const MAX_ERROR_LEN: usize = 500;

/// Result of one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub ok: bool,
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failure(message: impl AsRef<str>) -> Self {
        Self {
            ok: false,
            error: Some(truncate_chars(message.as_ref(), MAX_ERROR_LEN)),
        }
    }
}

/// Truncate to at most `max` characters
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Sends rendered receipt markup to a device
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, host: &str, port: u16, text: &str, cut: bool) -> DispatchOutcome;
}

/// Network dispatcher
#[derive(Debug, Clone)]
pub struct PrintDispatcher {
    connect_timeout: Duration,
    encoder: ReceiptEncoder,
}

impl Default for PrintDispatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl PrintDispatcher {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            encoder: ReceiptEncoder::new(),
        }
    }

    pub fn with_encoder(mut self, encoder: ReceiptEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

#[async_trait]
impl Dispatch for PrintDispatcher {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn dispatch(&self, host: &str, port: u16, text: &str, cut: bool) -> DispatchOutcome {
        let connected = match NetworkPrinter::new(host, port) {
            Ok(printer) => printer.with_timeout(self.connect_timeout).connect().await,
            Err(e) => Err(e),
        };

        let (mut sink, connect_error): (Box<dyn Sink>, _) = match connected {
            Ok(sink) => (Box::new(sink), None),
            Err(e) => {
                warn!(error = %e, "Printer unreachable, using null sink");
                (Box::new(NullSink::default()), Some(e.to_string()))
            }
        };

        let printed = self.encoder.print_to(text, cut, sink.as_mut()).await;

        match (connect_error, printed) {
            (Some(e), _) => DispatchOutcome::failure(e),
            (None, Err(e)) => {
                warn!(error = %e, "Print failed");
                DispatchOutcome::failure(e.to_string())
            }
            (None, Ok(())) => {
                info!("Receipt printed");
                DispatchOutcome::success()
            }
        }
    }
}
