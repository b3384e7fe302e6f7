//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// Attempted to overwrite a region that is not fully inside the storage.
    ///
    /// `write_at` may only rewrite bytes that already exist; it never
    /// extends the storage.
    #[error("write beyond end of storage: offset {offset}, len {len}, size {size}")]
    WritePastEnd {
        /// The requested write offset.
        offset: u64,
        /// The requested write length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// Attempted to truncate to a size larger than the current size.
    #[error("cannot truncate to {new_size}: storage is only {size} bytes")]
    TruncatePastEnd {
        /// The requested new size.
        new_size: u64,
        /// The current storage size.
        size: u64,
    },
}
