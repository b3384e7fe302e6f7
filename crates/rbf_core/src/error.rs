//! Error types for the RBF framing layer.
//!
//! Only programmer misuse and backend failures surface as errors.
//! Data-integrity conditions (truncation, corruption, checksum mismatch)
//! are never errors: the scanner reports them as "frame not found" or
//! silently resynchronizes past them.

use thiserror::Error;

/// Result type for framing operations.
pub type RbfResult<T> = Result<T, RbfError>;

/// Errors that can occur in the RBF framing layer.
#[derive(Debug, Error)]
pub enum RbfError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] rbf_storage::StorageError),

    /// A frame address was constructed from a negative offset.
    #[error("address offset cannot be negative: {offset}")]
    NegativeAddress {
        /// The offending offset.
        offset: i64,
    },

    /// Payload would overflow the 32-bit frame length field.
    #[error("payload of {payload_len} bytes does not fit a 32-bit frame length")]
    FrameTooLarge {
        /// The payload length that was rejected.
        payload_len: u64,
    },

    /// Operation not permitted in the current state.
    ///
    /// These indicate a logic error in the caller (e.g. committing with an
    /// unfilled reservation), not a data condition. They are fatal to the
    /// call and never retried internally.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl RbfError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
