//! Application error types for mobility-sync
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Feed retrieval errors
///
/// Covers both transport failures (unreachable feed, non-2xx status) and
/// malformed payloads. Feed errors are fatal to the run that hit them and are
/// never retried inline; the next scheduled batch is the retry mechanism.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Request timed out
    #[error("Feed request timed out")]
    Timeout,

    /// Connection refused
    #[error("Feed connection refused")]
    ConnectionRefused,

    /// Feed answered with a non-success status
    #[error("Feed returned HTTP {0}")]
    Status(u16),

    /// Response body could not be decoded into the expected document
    #[error("Malformed feed payload: {0}")]
    Malformed(String),

    /// Generic network error
    #[error("Feed network error: {0}")]
    Network(String),
}

/// A vehicle reported a form-factor/propulsion combination with no internal
/// mapping.
///
/// Classification refuses to guess a vehicle's category rather than mis-route
/// it, so this error aborts the whole run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("No vehicle type mapping for form factor {form_factor:?} with propulsion {propulsion_type:?}")]
pub struct ClassificationError {
    /// Vendor-reported form factor
    pub form_factor: String,
    /// Vendor-reported propulsion type
    pub propulsion_type: String,
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection-level failure
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Synchronization-related errors
///
/// Aggregates everything that can abort one vendor sync run. An error here
/// must never propagate beyond its own run; sibling vendors in the same batch
/// keep going.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Feed transport or decode failure
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Unmapped vehicle type
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// Storage failure; the transaction left prior state untouched
    #[error("Storage error: {0}")]
    Database(#[from] DbError),

    /// Run exceeded its watchdog timeout
    #[error("Sync run timed out")]
    Timeout,

    /// Invariant violation inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// True when the failure originated at the feed transport layer.
    ///
    /// Operational tooling uses this to separate vendor-side outages from
    /// data-quality problems.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Feed(
                FeedError::Timeout
                    | FeedError::ConnectionRefused
                    | FeedError::Status(_)
                    | FeedError::Network(_)
            ) | SyncError::Timeout
        )
    }
}
