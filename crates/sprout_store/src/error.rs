//! Store error types.

use thiserror::Error;

/// Errors surfaced by store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("row {row} not found in {sheet}")]
    RowNotFound {
        /// The collection that was searched.
        sheet: String,
        /// The missing row reference.
        row: u64,
    },

    /// A named collection could not be read or written.
    #[error("collection unavailable: {0}")]
    Unavailable(String),

    /// A row exists but could not be decoded into its domain type.
    #[error("corrupt row in {sheet}: {reason}")]
    CorruptRow {
        /// The collection holding the row.
        sheet: String,
        /// What failed to decode.
        reason: String,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
