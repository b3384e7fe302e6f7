//! Streaming frame construction with reservation-based backfill.

use crate::checksum::Crc32c;
use crate::error::{RbfError, RbfResult};
use crate::layout::{
    frame_length, status_length, FENCE_BYTES, FENCE_LEN, MAX_PAYLOAD_LEN,
};
use crate::types::{Address64, FrameStatus, FrameTag};
use rbf_storage::StorageBackend;
use std::fmt;
use tracing::{trace, warn};

use super::Framer;

/// Pending bytes beyond this size drain to the backend, keeping builder
/// memory bounded regardless of payload size.
const SPILL_THRESHOLD: usize = 64 * 1024;

/// Feeds frame bytes into a running CRC32C, skipping the first four.
///
/// Those four are the HeadLen field: it is backfilled at commit, after
/// CRC-relevant bytes may already have streamed out, which is exactly why
/// the format excludes it from the checksum.
struct CrcTap {
    crc: Crc32c,
    seen: u64,
}

impl CrcTap {
    fn new() -> Self {
        Self {
            crc: Crc32c::new(),
            seen: 0,
        }
    }

    fn absorb(&mut self, bytes: &[u8]) {
        if self.seen < 4 {
            let skip = ((4 - self.seen) as usize).min(bytes.len());
            self.crc.update(&bytes[skip..]);
        } else {
            self.crc.update(bytes);
        }
        self.seen += bytes.len() as u64;
    }

    fn finish(self) -> u32 {
        self.crc.finish()
    }
}

/// A reserved payload region awaiting backfill.
struct Slot {
    frame_offset: u64,
    len: usize,
    filled: bool,
}

/// Token for a reserved payload region.
///
/// Obtained from [`FrameBuilder::reserve`] and consumed by
/// [`FrameBuilder::fill`]. The token is the only handle to the region and
/// is not clonable, so a reservation cannot be filled twice.
#[derive(Debug)]
pub struct Reservation {
    index: usize,
    len: usize,
}

/// Streaming builder for a single frame.
///
/// Payload bytes are accepted incrementally through [`FrameBuilder::write`];
/// interior regions whose content is not yet known (length-prefixed
/// sub-records, for example) can be reserved with
/// [`FrameBuilder::reserve`] and backfilled with [`FrameBuilder::fill`]
/// any time before commit.
///
/// # Abort guarantees
///
/// Dropping the builder without committing abandons the frame. If no
/// bytes have drained to the backend yet - the common case - the pending
/// buffer is simply discarded and the frame never existed, at zero I/O
/// cost. If the frame grew past the spill threshold and bytes already
/// reached the backend, the builder instead seals what was written as a
/// tombstone-status frame, so any reader still observes byte-for-byte
/// consistent framing.
pub struct FrameBuilder<'a, B: StorageBackend> {
    framer: &'a mut Framer<B>,
    frame_start: u64,
    /// Frame bytes not yet handed to the backend; `pending[0]` sits at
    /// frame offset `drained`.
    pending: Vec<u8>,
    drained: u64,
    payload_len: u64,
    slots: Vec<Slot>,
    crc: CrcTap,
    finished: bool,
}

impl<'a, B: StorageBackend> FrameBuilder<'a, B> {
    pub(super) fn new(framer: &'a mut Framer<B>, tag: FrameTag) -> Self {
        let frame_start = framer.position;
        let mut pending = Vec::with_capacity(256);
        // HeadLen placeholder, backfilled at commit
        pending.extend_from_slice(&[0u8; 4]);
        pending.extend_from_slice(&tag.as_u32().to_le_bytes());
        Self {
            framer,
            frame_start,
            pending,
            drained: 0,
            payload_len: 0,
            slots: Vec::new(),
            crc: CrcTap::new(),
            finished: false,
        }
    }

    /// Returns the number of payload bytes written or reserved so far.
    #[must_use]
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Appends payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RbfError::FrameTooLarge`] if the payload would overflow
    /// the 32-bit length fields, or a storage error if draining to the
    /// backend fails.
    pub fn write(&mut self, bytes: &[u8]) -> RbfResult<()> {
        self.check_capacity(bytes.len())?;
        self.pending.extend_from_slice(bytes);
        self.payload_len += bytes.len() as u64;
        self.maybe_drain()
    }

    /// Reserves `len` payload bytes for later backfill.
    ///
    /// The region reads as zeroes until [`FrameBuilder::fill`] is called
    /// with the returned token. Every reservation must be filled before
    /// [`FrameBuilder::commit`].
    ///
    /// # Errors
    ///
    /// Returns [`RbfError::FrameTooLarge`] if the payload would overflow
    /// the 32-bit length fields, or a storage error if draining fails.
    pub fn reserve(&mut self, len: usize) -> RbfResult<Reservation> {
        self.check_capacity(len)?;
        let frame_offset = self.drained + self.pending.len() as u64;
        self.pending.resize(self.pending.len() + len, 0);
        self.slots.push(Slot {
            frame_offset,
            len,
            filled: false,
        });
        self.payload_len += len as u64;
        self.maybe_drain()?;
        Ok(Reservation {
            index: self.slots.len() - 1,
            len,
        })
    }

    /// Backfills a reserved region.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error if `bytes` is not exactly the
    /// reserved length, or a storage error if draining fails.
    pub fn fill(&mut self, reservation: Reservation, bytes: &[u8]) -> RbfResult<()> {
        if bytes.len() != reservation.len {
            return Err(RbfError::invalid_operation(format!(
                "reservation fill length mismatch: reserved {}, got {}",
                reservation.len,
                bytes.len()
            )));
        }
        let slot = &mut self.slots[reservation.index];
        // Unfilled regions never drain, so the slot is still pending
        let rel = (slot.frame_offset - self.drained) as usize;
        self.pending[rel..rel + bytes.len()].copy_from_slice(bytes);
        slot.filled = true;
        self.maybe_drain()
    }

    /// Completes the frame.
    ///
    /// Derives the payload length from the bytes written, appends the
    /// status fill and TailLen, backfills the reserved HeadLen, finalizes
    /// the running CRC, and appends CRC plus trailing fence. Returns the
    /// frame's address.
    ///
    /// Consuming `self` makes a second commit unrepresentable.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error if any payload reservation is
    /// still unfilled, or a storage error from the backend.
    pub fn commit(mut self) -> RbfResult<Address64> {
        if let Some(index) = self.slots.iter().position(|slot| !slot.filled) {
            return Err(RbfError::invalid_operation(format!(
                "cannot commit frame with unfilled reservation #{index}"
            )));
        }
        self.seal(false)
    }

    /// Abandons the frame.
    ///
    /// Equivalent to dropping the builder; see the type documentation for
    /// the abort guarantees.
    pub fn abort(self) {}

    fn check_capacity(&self, extra: usize) -> RbfResult<()> {
        let payload_len = self.payload_len + extra as u64;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(RbfError::FrameTooLarge { payload_len });
        }
        Ok(())
    }

    /// Drains the drainable prefix of the pending buffer to the backend
    /// once it grows past the spill threshold.
    ///
    /// Draining stops at the first unfilled payload reservation: its
    /// final bytes must pass through the CRC in positional order. The
    /// HeadLen placeholder is CRC-exempt and may drain freely; it is
    /// backfilled through the backend at commit.
    fn maybe_drain(&mut self) -> RbfResult<()> {
        if self.pending.len() <= SPILL_THRESHOLD {
            return Ok(());
        }
        let pending_end = self.drained + self.pending.len() as u64;
        let limit = self
            .slots
            .iter()
            .filter(|slot| !slot.filled)
            .map(|slot| slot.frame_offset)
            .min()
            .unwrap_or(pending_end)
            .min(pending_end);
        let drainable = (limit - self.drained) as usize;
        if drainable == 0 {
            return Ok(());
        }
        self.crc.absorb(&self.pending[..drainable]);
        self.framer.backend.append(&self.pending[..drainable])?;
        self.pending.drain(..drainable);
        self.drained += drainable as u64;
        Ok(())
    }

    fn seal(&mut self, tombstone: bool) -> RbfResult<Address64> {
        let status_len = status_length(self.payload_len);
        let frame_len = frame_length(self.payload_len);
        debug_assert!(frame_len <= u64::from(u32::MAX));
        let len_bytes = (frame_len as u32).to_le_bytes();
        let status = FrameStatus::new(status_len, tombstone);

        self.pending
            .resize(self.pending.len() + status_len as usize, status.as_byte());
        self.pending.extend_from_slice(&len_bytes);

        let mut tap = std::mem::replace(&mut self.crc, CrcTap::new());
        let pending = std::mem::take(&mut self.pending);
        let address = Address64::new(self.frame_start);

        if self.drained == 0 {
            // Clean path: the whole frame is still local. Backfill the
            // head in place and push frame, CRC and fence in one append.
            let mut out = pending;
            out[..4].copy_from_slice(&len_bytes);
            tap.absorb(&out);
            let crc_value = tap.finish();
            out.extend_from_slice(&crc_value.to_le_bytes());
            out.extend_from_slice(&FENCE_BYTES);
            self.framer.backend.append(&out)?;
        } else {
            // Spilled path: earlier bytes already sit in the backend.
            // The CRC must come after TailLen, so it goes straight to the
            // raw output once the backfill is done.
            tap.absorb(&pending);
            self.framer.backend.append(&pending)?;
            self.framer.backend.write_at(self.frame_start, &len_bytes)?;
            let crc_value = tap.finish();
            let mut tail = Vec::with_capacity(8);
            tail.extend_from_slice(&crc_value.to_le_bytes());
            tail.extend_from_slice(&FENCE_BYTES);
            self.framer.backend.append(&tail)?;
        }

        self.framer.position = self.frame_start + frame_len + FENCE_LEN;
        self.finished = true;
        Ok(address)
    }
}

impl<B: StorageBackend> Drop for FrameBuilder<'_, B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.drained == 0 {
            // Optimistic clean abort: nothing reached the backend, the
            // frame never existed.
            trace!(frame_start = self.frame_start, "discarding uncommitted frame");
            return;
        }
        // Bytes already reached the backend; seal them as a tombstone so
        // readers still observe consistent framing.
        match self.seal(true) {
            Ok(address) => {
                warn!(%address, "sealed partially written frame as a tombstone");
            }
            Err(error) => {
                warn!(
                    %error,
                    frame_start = self.frame_start,
                    "failed to seal aborted frame"
                );
            }
        }
    }
}

impl<B: StorageBackend> fmt::Debug for FrameBuilder<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuilder")
            .field("frame_start", &self.frame_start)
            .field("payload_len", &self.payload_len)
            .field("drained", &self.drained)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use rbf_storage::InMemoryBackend;

    fn framer() -> Framer<InMemoryBackend> {
        Framer::new(InMemoryBackend::new(), true).unwrap()
    }

    fn one_shot_bytes(tag: FrameTag, payload: &[u8]) -> Vec<u8> {
        let mut framer = framer();
        framer.append(tag, payload).unwrap();
        framer.into_inner().data()
    }

    #[test]
    fn streaming_matches_one_shot() {
        let tag = FrameTag::new(0xBEEF);
        let payload = b"streamed in three separate chunks";

        let mut framer = framer();
        let mut builder = framer.begin_frame(tag);
        builder.write(&payload[..9]).unwrap();
        builder.write(&payload[9..20]).unwrap();
        builder.write(&payload[20..]).unwrap();
        let addr = builder.commit().unwrap();

        assert_eq!(addr.as_u64(), FENCE_LEN);
        assert_eq!(framer.into_inner().data(), one_shot_bytes(tag, payload));
    }

    #[test]
    fn empty_streaming_frame_matches_one_shot() {
        let tag = FrameTag::new(3);

        let mut framer = framer();
        let builder = framer.begin_frame(tag);
        builder.commit().unwrap();

        assert_eq!(framer.into_inner().data(), one_shot_bytes(tag, b""));
    }

    #[test]
    fn reservation_backfill_matches_direct_write() {
        let tag = FrameTag::new(9);
        let body = b"sub-record body";
        // Length-prefixed sub-record: the prefix is known only after the
        // body is written.
        let mut expected_payload = (body.len() as u32).to_le_bytes().to_vec();
        expected_payload.extend_from_slice(body);

        let mut framer = framer();
        let mut builder = framer.begin_frame(tag);
        let prefix = builder.reserve(4).unwrap();
        builder.write(body).unwrap();
        builder
            .fill(prefix, &(body.len() as u32).to_le_bytes())
            .unwrap();
        builder.commit().unwrap();

        assert_eq!(
            framer.into_inner().data(),
            one_shot_bytes(tag, &expected_payload)
        );
    }

    #[test]
    fn unfilled_reservation_rejected_at_commit() {
        let mut framer = framer();
        let mut builder = framer.begin_frame(FrameTag::new(1));
        builder.reserve(8).unwrap();
        builder.write(b"data").unwrap();

        let result = builder.commit();
        assert!(matches!(result, Err(RbfError::InvalidOperation { .. })));
    }

    #[test]
    fn fill_length_mismatch_rejected() {
        let mut framer = framer();
        let mut builder = framer.begin_frame(FrameTag::new(1));
        let reservation = builder.reserve(4).unwrap();

        let result = builder.fill(reservation, b"too many bytes");
        assert!(matches!(result, Err(RbfError::InvalidOperation { .. })));
    }

    #[test]
    fn clean_abort_leaves_no_bytes() {
        let mut framer = framer();
        {
            let mut builder = framer.begin_frame(FrameTag::new(1));
            builder.write(b"never committed").unwrap();
            // Dropped without commit
        }
        assert_eq!(framer.position(), FENCE_LEN);
        assert_eq!(framer.into_inner().data(), FENCE_BYTES);
    }

    #[test]
    fn explicit_abort_leaves_no_bytes() {
        let mut framer = framer();
        let mut builder = framer.begin_frame(FrameTag::new(1));
        builder.write(b"abandoned").unwrap();
        builder.abort();

        assert_eq!(framer.into_inner().data(), FENCE_BYTES);
    }

    #[test]
    fn large_frame_spills_and_commits() {
        let tag = FrameTag::new(0x51);
        let payload = vec![0x5A_u8; 200 * 1024];

        let mut framer = framer();
        let mut builder = framer.begin_frame(tag);
        for chunk in payload.chunks(10_000) {
            builder.write(chunk).unwrap();
        }
        builder.commit().unwrap();

        // The spilled path must produce the same bytes as the one-shot path
        assert_eq!(framer.into_inner().data(), one_shot_bytes(tag, &payload));
    }

    #[test]
    fn spilled_abort_seals_tombstone() {
        let mut framer = framer();
        {
            let mut builder = framer.begin_frame(FrameTag::new(0x77));
            builder.write(&vec![1_u8; 100 * 1024]).unwrap();
            // Dropped after bytes drained to the backend
        }

        let backend = framer.into_inner();
        let scanner = Scanner::new(&backend);
        let frames: Vec<_> = scanner.scan_reverse().collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].status.is_tombstone());
        assert_eq!(frames[0].tag, FrameTag::new(0x77));
    }

    #[test]
    fn reservation_survives_spill_of_earlier_bytes() {
        let tag = FrameTag::new(0x42);
        let mut framer = framer();
        let mut builder = framer.begin_frame(tag);

        let marker = builder.reserve(4).unwrap();
        let bulk = vec![7_u8; 150 * 1024];
        for chunk in bulk.chunks(8_192) {
            builder.write(chunk).unwrap();
        }
        // The unfilled reservation pins the payload in memory until filled
        builder.fill(marker, b"MARK").unwrap();
        builder.commit().unwrap();

        let mut expected_payload = b"MARK".to_vec();
        expected_payload.extend_from_slice(&bulk);
        assert_eq!(
            framer.into_inner().data(),
            one_shot_bytes(tag, &expected_payload)
        );
    }

    #[test]
    fn payload_len_tracks_writes_and_reservations() {
        let mut framer = framer();
        let mut builder = framer.begin_frame(FrameTag::new(1));
        assert_eq!(builder.payload_len(), 0);

        builder.write(b"abc").unwrap();
        let r = builder.reserve(5).unwrap();
        assert_eq!(builder.payload_len(), 8);

        builder.fill(r, b"12345").unwrap();
        assert_eq!(builder.payload_len(), 8);
        builder.commit().unwrap();
    }
}
