//! Error types for mtg_price_sync

use thiserror::Error;

/// Unified error type for sync operations
///
/// Only errors that must abort a whole cycle live here. A card that cannot be
/// matched is reported through [`crate::resolver::Unresolved`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Failed to parse JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Synonym table could not be read
    #[error("Synonym table error: {0}")]
    SynonymTable(#[from] csv::Error),
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A shop lists a redaction the synonym table does not know about
    #[error("Unknown redaction found at {shop}: {name}")]
    UnknownRedaction { shop: String, name: String },
    /// Shop id is not configured
    #[error("Unknown shop: {0}")]
    UnknownShop(String),
    /// Redaction has no listing URL for the shop
    #[error("Redaction '{redaction}' is not listed by {shop}")]
    ShopNotListed { shop: String, redaction: String },
    /// Storage lock was poisoned by a panicking writer
    #[error("Catalog store lock poisoned")]
    StoreLock,
}

impl SyncError {
    /// True for errors that mean the stored synonym data is stale
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, SyncError::UnknownRedaction { .. })
    }
}

/// Short name for [`SyncError`], re-exported at the crate root
pub type Error = SyncError;

/// Result alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
