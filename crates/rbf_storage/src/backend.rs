//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level byte store for RBF logs.
///
/// Storage backends are **opaque byte stores**. They provide simple
/// operations for reading, appending, backfilling, and flushing bytes.
/// The framing layer owns all format interpretation - backends do not
/// understand frames, fences, or checksums.
///
/// # Invariants
///
/// - `append` returns the offset where the data was written
/// - `read_at` fills the caller's buffer with exactly the bytes previously
///   written at that offset
/// - `write_at` rewrites bytes that already exist; it never extends the
///   store (appending is the only way to grow it)
/// - `flush` pushes buffered bytes to the underlying medium
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing and ephemeral logs
/// - [`super::FileBackend`] - For persistent logs
pub trait StorageBackend: Send + Sync {
    /// Reads exactly `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Overwrites `data.len()` bytes starting at `offset`.
    ///
    /// The target region must already exist in full. This exists so the
    /// framing layer can backfill a reserved length field after the bytes
    /// that follow it have been appended.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The region extends beyond the current size
    /// - An I/O error occurs
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Flushes all pending writes to the underlying medium.
    ///
    /// This carries no fsync guarantee; use [`StorageBackend::sync`] when
    /// durability ordering matters.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// A stronger guarantee than `flush` - file metadata (size) is also
    /// made durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the storage to the given size.
    ///
    /// All data after `new_size` is discarded. The framing layer does not
    /// call this; it exists for crash-simulation tests and for external
    /// reclamation tooling.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `new_size` is greater than the current size
    /// - The truncation fails
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        (**self).read_at(offset, buf)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        (**self).append(data)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        (**self).write_at(offset, data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        (**self).truncate(new_size)
    }
}
