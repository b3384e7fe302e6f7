//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// Persists log bytes using OS file APIs; data survives process restarts.
///
/// # Durability
///
/// - `flush()` calls `File::flush()` to push data to the OS
/// - `sync()` calls `File::sync_all()` to push data and metadata to disk
///
/// Ordering of syncs across files is the caller's responsibility.
///
/// # Example
///
/// ```no_run
/// use rbf_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("log.rbf")).unwrap();
/// backend.append(b"persistent bytes").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// An existing file is opened for reading and appending; a missing
    /// file is created empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let size = *self.size.read();
        let end = offset.saturating_add(buf.len() as u64);

        if end > size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len: buf.len(),
                size,
            });
        }

        if buf.is_empty() {
            return Ok(());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;

        Ok(())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        if !data.is_empty() {
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(data)?;
            *size += data.len() as u64;
        }

        Ok(offset)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let mut file = self.file.write();
        let size = self.size.write();

        let end = offset.saturating_add(data.len() as u64);
        if end > *size {
            return Err(StorageError::WritePastEnd {
                offset,
                len: data.len(),
                size: *size,
            });
        }

        if !data.is_empty() {
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(data)?;
        }

        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::TruncatePastEnd {
                new_size,
                size: *size,
            });
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;

        Ok(())
    }
}
