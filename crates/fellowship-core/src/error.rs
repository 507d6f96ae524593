//! Error types for Fellowship

use thiserror::Error;

use crate::record::RecordKind;

/// Main error type for Fellowship directory operations
///
/// Propagation policy: write-path errors (`push`, `subscribe`) are always
/// surfaced to the caller and are retryable at the caller's discretion.
/// Read-path decode errors are absorbed per record during `fetch` (logged,
/// skipped) so one malformed remote record cannot starve a whole list view.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or store unreachable; the caller may retry
    #[error("Transport error: {0}")]
    Transport(String),

    /// A fetched record is missing a required field, has an unparseable
    /// value, or carries an identifier that does not parse as the expected
    /// id type. Logged and skipped per record on the read path, never
    /// surfaced from `fetch`.
    #[error("Decode error for {kind} record {record_id}: {reason}")]
    Decode {
        /// Kind of the record that failed to decode
        kind: RecordKind,
        /// External identifier of the offending record
        record_id: String,
        /// Which field or value was rejected
        reason: String,
    },

    /// Subscription was not found in the store
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using SyncError
pub type SyncResult<T> = Result<T, SyncError>;
