//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

/// Error raised by a single inline markup tag
///
/// A failing tag only loses its own effect; the encoder logs it and moves on.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("invalid size '{0}', expected WxH")]
    InvalidSize(String),

    #[error("invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("image tag without a path")]
    MissingPath,

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Bitmap rasterization errors
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("image has no pixels")]
    Empty,

    #[error("raster too large: {width_bytes} bytes x {height} rows")]
    TooLarge { width_bytes: u32, height: u32 },

    #[error("image file not found: {0}")]
    NotFound(String),

    #[error("image support not compiled in")]
    Unsupported,

    /// Image decoding error
    #[cfg(feature = "image")]
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
}
