//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory storage backend.
///
/// All data lives in a byte vector. Suitable for:
/// - Unit and integration tests
/// - Ephemeral logs that never touch disk
///
/// # Example
///
/// ```rust
/// use rbf_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let offset = backend.append(b"test data").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(backend.size().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory backend over pre-existing bytes.
    ///
    /// Useful for scanning hand-built or deliberately damaged logs in
    /// tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of all bytes in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(buf.len() as u64);

        if end > size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len: buf.len(),
                size,
            });
        }

        let start = offset as usize;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        Ok(())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn write_at(&mut self, offset: u64, new_data: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        let end = offset.saturating_add(new_data.len() as u64);

        if end > size {
            return Err(StorageError::WritePastEnd {
                offset,
                len: new_data.len(),
                size,
            });
        }

        let start = offset as usize;
        data[start..start + new_data.len()].copy_from_slice(new_data);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Nothing buffered
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        // No metadata to sync
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;

        if new_size > size {
            return Err(StorageError::TruncatePastEnd { new_size, size });
        }

        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.data().is_empty());
    }

    #[test]
    fn append_returns_offsets() {
        let mut backend = InMemoryBackend::new();

        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.size().unwrap(), 11);
    }

    #[test]
    fn read_at_fills_buffer() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello world").unwrap();

        let mut buf = [0u8; 5];
        backend.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        backend.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn read_past_end_fails() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();

        let mut buf = [0u8; 5];
        let result = backend.read_at(3, &mut buf);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn write_at_overwrites_in_place() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"....data").unwrap();

        backend.write_at(0, b"head").unwrap();
        assert_eq!(backend.data(), b"headdata");
        assert_eq!(backend.size().unwrap(), 8);
    }

    #[test]
    fn write_at_cannot_extend() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();

        let result = backend.write_at(3, b"overflow");
        assert!(matches!(result, Err(StorageError::WritePastEnd { .. })));
        // Store untouched on failure
        assert_eq!(backend.data(), b"hello");
    }

    #[test]
    fn empty_read_always_succeeds() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();

        let mut buf = [0u8; 0];
        backend.read_at(2, &mut buf).unwrap();
        backend.read_at(5, &mut buf).unwrap();
    }

    #[test]
    fn with_data_preloads() {
        let backend = InMemoryBackend::with_data(b"preloaded".to_vec());
        assert_eq!(backend.size().unwrap(), 9);

        let mut buf = [0u8; 9];
        backend.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"preloaded");
    }

    #[test]
    fn truncate_discards_tail() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello world").unwrap();

        backend.truncate(5).unwrap();
        assert_eq!(backend.size().unwrap(), 5);
        assert_eq!(backend.data(), b"hello");
    }

    #[test]
    fn truncate_past_end_fails() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();

        let result = backend.truncate(100);
        assert!(matches!(result, Err(StorageError::TruncatePastEnd { .. })));
    }

    #[test]
    fn flush_and_sync_are_noops() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"data").unwrap();
        assert!(backend.flush().is_ok());
        assert!(backend.sync().is_ok());
    }
}
