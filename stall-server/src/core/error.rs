use thiserror::Error;

use crate::db::{CatalogError, PrintLogError, StoreError};

/// Startup and server lifecycle errors
///
/// Request handlers return [`shared::AppError`] instead.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Order store error: {0}")]
    OrderStore(#[from] StoreError),

    #[error("Print log error: {0}")]
    PrintLog(#[from] PrintLogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
