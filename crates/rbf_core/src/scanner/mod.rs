//! Reverse frame scanner.
//!
//! The scanner recovers frames from a log without any external index. It
//! trusts nothing: every field it reads is cross-checked against the
//! fences, the redundant head/tail lengths, the status fill region, and
//! the CRC before a frame is surfaced.
//!
//! ## Resync
//!
//! [`Scanner::scan_reverse`] walks from the physical tail toward the
//! Genesis Fence with a single cursor. Any failed probe moves the cursor
//! back exactly 4 bytes and tries again, so pervasive corruption costs at
//! most one probe per 4 bytes of log. A successful probe jumps the cursor
//! over the whole validated frame in one step, so well-formed logs scan
//! in time proportional to the frame count, not the byte count.
//!
//! ## Integrity failures are not errors
//!
//! Truncation, corruption, checksum mismatches and torn writes all
//! manifest as "frame skipped" or "not found", never as `Err` or a panic.
//! The scan always makes forward progress and terminates.
//!
//! ## Backings
//!
//! The scanner reads through the [`ReadAt`] primitive. In-memory byte
//! vectors and the storage backends all implement it, and a scanner over
//! any of them produces identical results for identical bytes. Checksum
//! verification proceeds in bounded-size chunks, so scanning never
//! materializes a payload regardless of its size.

mod reverse;

pub use reverse::ScanReverse;

use crate::checksum::Crc32c;
use crate::layout::{
    is_aligned, status_length, FENCE_BYTES, FENCE_LEN, FRAME_OVERHEAD, FRAME_TAG_OFFSET,
    MIN_FRAME_LEN, PAYLOAD_OFFSET,
};
use crate::types::{Address64, FrameStatus, FrameTag};
use rbf_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::fmt;
use tracing::debug;

/// Checksum verification reads the frame body in chunks of this size.
const CRC_CHUNK: usize = 64 * 1024;

/// Random-access byte source a scanner reads from.
///
/// Implementations must be cheap to probe: the scanner issues many small
/// reads. Out-of-bounds reads return `false` rather than failing; the
/// scanner treats any unreadable byte as evidence that no valid frame is
/// present there.
pub trait ReadAt {
    /// Returns the total number of readable bytes.
    fn size(&self) -> u64;

    /// Fills `buf` with the bytes at `offset`, returning `false` if the
    /// range is not fully readable.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> bool;
}

impl ReadAt for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> bool {
        let Ok(start) = usize::try_from(offset) else {
            return false;
        };
        let Some(end) = start.checked_add(buf.len()) else {
            return false;
        };
        if end > self.len() {
            return false;
        }
        buf.copy_from_slice(&self[start..end]);
        true
    }
}

impl ReadAt for InMemoryBackend {
    fn size(&self) -> u64 {
        StorageBackend::size(self).unwrap_or(0)
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> bool {
        StorageBackend::read_at(self, offset, buf).is_ok()
    }
}

impl ReadAt for FileBackend {
    fn size(&self) -> u64 {
        StorageBackend::size(self).unwrap_or(0)
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> bool {
        StorageBackend::read_at(self, offset, buf).is_ok()
    }
}

/// A validated frame, as recovered by a scanner.
///
/// This is an ephemeral read-model: it borrows nothing and holds no
/// payload bytes. Copy the payload out with [`Scanner::read_payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbfFrame {
    /// Offset of the frame's `HeadLen` field.
    pub file_offset: u64,
    /// The frame's record-type tag.
    pub tag: FrameTag,
    /// Offset of the first payload byte.
    pub payload_offset: u64,
    /// Payload length in bytes.
    pub payload_length: u32,
    /// Decoded frame status.
    pub status: FrameStatus,
}

impl RbfFrame {
    /// Returns the frame's address.
    #[must_use]
    pub fn address(&self) -> Address64 {
        Address64::new(self.file_offset)
    }

    /// Whether this frame carries the tombstone status.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.status.is_tombstone()
    }
}

/// Validating reader over an immutable log region.
///
/// Scanners only read; any number of independent scanners may operate
/// over the same bytes concurrently.
#[derive(Clone, Copy)]
pub struct Scanner<'a> {
    source: &'a dyn ReadAt,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over a byte source.
    #[must_use]
    pub fn new(source: &'a dyn ReadAt) -> Self {
        Self { source }
    }

    /// Attempts to read the frame at `address`.
    ///
    /// Returns `None` for anything other than a fully valid frame at that
    /// exact position: misaligned or null addresses, missing fences,
    /// disagreeing length fields, bad status bytes, checksum mismatches,
    /// and reads past the end all fail quietly.
    #[must_use]
    pub fn try_read_at(&self, address: Address64) -> Option<RbfFrame> {
        if !address.is_valid() {
            return None;
        }
        let frame_start = address.as_u64();
        if frame_start < FENCE_LEN || !self.fence_at(frame_start - FENCE_LEN) {
            return None;
        }

        let head_len = u64::from(self.read_u32(frame_start)?);
        if head_len < MIN_FRAME_LEN || !is_aligned(head_len) {
            return None;
        }
        let record_end = frame_start.checked_add(head_len)?;
        if !self.fence_at(record_end) {
            return None;
        }

        let tail_len = u64::from(self.read_u32(record_end - 8)?);
        if tail_len != head_len {
            return None;
        }

        self.validate_body(frame_start, record_end)
    }

    /// Returns a lazy iterator over all valid frames, newest first.
    ///
    /// The iterator is finite and yields every frame that survives
    /// validation, tombstones included. It reflects the bytes as they
    /// were when iteration started; scanning a region that is being
    /// appended to concurrently is the caller's coordination problem.
    #[must_use]
    pub fn scan_reverse(&self) -> ScanReverse<'a> {
        ScanReverse::new(*self)
    }

    /// Copies a frame's payload out of the log.
    ///
    /// The returned bytes are owned and independent of the scanner.
    /// Returns `None` if the payload region is no longer readable.
    #[must_use]
    pub fn read_payload(&self, frame: &RbfFrame) -> Option<Vec<u8>> {
        let mut payload = vec![0u8; frame.payload_length as usize];
        if !self.source.read_exact_at(frame.payload_offset, &mut payload) {
            return None;
        }
        Some(payload)
    }

    fn source_size(&self) -> u64 {
        self.source.size()
    }

    fn read_u32(&self, offset: u64) -> Option<u32> {
        let mut buf = [0u8; 4];
        if !self.source.read_exact_at(offset, &mut buf) {
            return None;
        }
        Some(u32::from_le_bytes(buf))
    }

    fn fence_at(&self, offset: u64) -> bool {
        let mut buf = [0u8; 4];
        self.source.read_exact_at(offset, &mut buf) && buf == FENCE_BYTES
    }

    /// Validates everything between the length fields of a candidate
    /// frame spanning `[frame_start, record_end)`.
    ///
    /// Callers have already established that both fences exist and that
    /// `HeadLen == TailLen == record_end - frame_start` is aligned and at
    /// least the minimum frame length.
    fn validate_body(&self, frame_start: u64, record_end: u64) -> Option<RbfFrame> {
        let head_len = record_end - frame_start;
        let payload_plus_status = head_len - FRAME_OVERHEAD;
        if payload_plus_status < 1 || !is_aligned(payload_plus_status) {
            return None;
        }

        let tag = FrameTag::new(self.read_u32(frame_start + FRAME_TAG_OFFSET)?);

        // Last byte of the status fill region
        let mut status_byte = [0u8; 1];
        if !self.source.read_exact_at(record_end - 9, &mut status_byte) {
            return None;
        }
        let status = FrameStatus::from_byte(status_byte[0])?;

        let status_len = status.status_len();
        if payload_plus_status < status_len {
            return None;
        }
        let payload_len = payload_plus_status - status_len;
        // A corrupted status byte may still decode; the payload length it
        // implies must independently agree with the fill-length formula
        if status_length(payload_len) != status_len {
            return None;
        }

        // Every fill byte must repeat the status byte exactly
        let status_start = frame_start + PAYLOAD_OFFSET + payload_len;
        let mut fill = [0u8; 4];
        let region = &mut fill[..status_len as usize];
        if !self.source.read_exact_at(status_start, region) {
            return None;
        }
        if region.iter().any(|&byte| byte != status.as_byte()) {
            return None;
        }

        let stored_crc = self.read_u32(record_end - 4)?;
        let computed_crc = self.crc_over(frame_start + 4, record_end - 4)?;
        if stored_crc != computed_crc {
            debug!(
                offset = frame_start,
                stored = stored_crc,
                computed = computed_crc,
                "frame checksum mismatch"
            );
            return None;
        }

        Some(RbfFrame {
            file_offset: frame_start,
            tag,
            payload_offset: frame_start + PAYLOAD_OFFSET,
            payload_length: payload_len as u32,
            status,
        })
    }

    /// Recomputes the CRC32C of `[start, end)` in bounded-size chunks.
    fn crc_over(&self, start: u64, end: u64) -> Option<u32> {
        let total = (end - start) as usize;
        let mut crc = Crc32c::new();
        let mut buf = vec![0u8; total.min(CRC_CHUNK)];
        let mut offset = start;
        while offset < end {
            let n = ((end - offset) as usize).min(CRC_CHUNK);
            let chunk = &mut buf[..n];
            if !self.source.read_exact_at(offset, chunk) {
                return None;
            }
            crc.update(chunk);
            offset += n as u64;
        }
        Some(crc.finish())
    }
}

impl fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("size", &self.source.size())
            .finish_non_exhaustive()
    }
}
