//! Output sinks for ESC/POS data
//!
//! - [`NetworkSink`]: raw TCP (port 9100), opened by [`NetworkPrinter::connect`]
//! - [`NullSink`]: discards everything, used when the printer is unreachable
//! - [`MemorySink`]: collects bytes in memory

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

/// Byte sink an encoded receipt is streamed into
#[async_trait]
pub trait Sink: Send {
    async fn write(&mut self, bytes: &[u8]) -> PrintResult<()>;

    /// Flush and release the device; must be safe to call more than once
    async fn close(&mut self) -> PrintResult<()>;
}

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(PrintError::InvalidConfig("empty printer host".into()));
        }
        if port == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "invalid port 0 for {}",
                host
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            timeout: Duration::from_secs(5),
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open a connection, bounded by the configured timeout
    #[instrument(fields(addr = %self.addr()))]
    pub async fn connect(&self) -> PrintResult<NetworkSink> {
        let addr = self.addr();
        let stream = tokio::time::timeout(
            self.timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", addr)))?
        .map_err(|e| PrintError::Connection(format!("{}: {}", addr, e)))?;

        info!("Connected to printer");
        Ok(NetworkSink {
            stream: Some(stream),
            addr,
            written: 0,
        })
    }
}

/// Open TCP connection to a printer
#[derive(Debug)]
pub struct NetworkSink {
    stream: Option<TcpStream>,
    addr: String,
    written: usize,
}

#[async_trait]
impl Sink for NetworkSink {
    async fn write(&mut self, bytes: &[u8]) -> PrintResult<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| PrintError::Connection(format!("{}: already closed", self.addr)))?;
        stream.write_all(bytes).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;
        self.written += bytes.len();
        Ok(())
    }

    async fn close(&mut self) -> PrintResult<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush().await?;
            stream.shutdown().await?;
            info!(addr = %self.addr, bytes = self.written, "Print job sent");
        }
        Ok(())
    }
}

/// Sink that drops all data
#[derive(Debug, Default)]
pub struct NullSink {
    discarded: usize,
}

impl NullSink {
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

#[async_trait]
impl Sink for NullSink {
    async fn write(&mut self, bytes: &[u8]) -> PrintResult<()> {
        self.discarded += bytes.len();
        Ok(())
    }

    async fn close(&mut self) -> PrintResult<()> {
        debug!(bytes = self.discarded, "null sink closed");
        Ok(())
    }
}

/// Sink that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub data: Vec<u8>,
    pub closed: bool,
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&mut self, bytes: &[u8]) -> PrintResult<()> {
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    async fn close(&mut self) -> PrintResult<()> {
        self.closed = true;
        Ok(())
    }
}
