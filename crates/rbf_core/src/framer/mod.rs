//! Forward frame writer.
//!
//! The framer appends fence-delimited frames to a storage backend:
//!
//! ```text
//! | HeadLen (4) | FrameTag (4) | Payload (N) | Status (S) | TailLen (4) | CRC32C (4) |
//! ```
//!
//! with a fence before the first frame (the Genesis Fence, written at
//! construction) and after every frame. `S` is `4 - (N mod 4)`, so every
//! frame is a multiple of 4 bytes and every frame address is 4-byte
//! aligned.
//!
//! Two write paths exist:
//!
//! - [`Framer::append`] for payloads that are already materialized: the
//!   whole frame is assembled in one buffer and appended in one call.
//! - [`Framer::begin_frame`] for streaming construction: the returned
//!   [`FrameBuilder`] accepts payload bytes incrementally, supports
//!   reserving interior regions for later backfill, and keeps memory
//!   bounded by draining large frames to the backend before commit.
//!
//! A builder borrows the framer mutably, so a second builder, or an
//! `append` while one is open, is a compile error rather than a runtime
//! one. Dropping a builder without committing discards the frame; see
//! [`FrameBuilder`] for the abort guarantees.
//!
//! Durability is the caller's concern: [`Framer::flush`] pushes buffered
//! bytes to the backend but carries no fsync ordering guarantee.

mod builder;

pub use builder::{FrameBuilder, Reservation};

use crate::checksum::Crc32c;
use crate::error::{RbfError, RbfResult};
use crate::layout::{
    frame_length, status_length, FENCE_BYTES, FENCE_LEN, MAX_PAYLOAD_LEN,
};
use crate::types::{Address64, FrameTag, FrameStatus};
use rbf_storage::StorageBackend;

/// Appends RBF frames to a storage backend.
///
/// A framer is single-writer: it is not safe for concurrent use, and the
/// borrow checker enforces that at most one streaming builder is open at
/// a time.
pub struct Framer<B: StorageBackend> {
    backend: B,
    position: u64,
}

impl<B: StorageBackend> Framer<B> {
    /// Creates a framer over a backend.
    ///
    /// If the backend is empty and `write_genesis` is set, the Genesis
    /// Fence is appended so the first frame lands at offset 4. Pass
    /// `false` when appending to a log that already ends with a fence.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be read or the fence
    /// cannot be written.
    pub fn new(mut backend: B, write_genesis: bool) -> RbfResult<Self> {
        let mut position = backend.size()?;
        if position == 0 && write_genesis {
            backend.append(&FENCE_BYTES)?;
            position = FENCE_LEN;
        }
        Ok(Self { backend, position })
    }

    /// Returns the offset at which the next frame will start.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Appends a complete frame in one pass.
    ///
    /// Returns the address of the frame's `HeadLen` field. The CRC is
    /// computed directly over the in-memory span, and frame plus trailing
    /// fence reach the backend in a single append.
    ///
    /// # Errors
    ///
    /// Returns [`RbfError::FrameTooLarge`] if the payload does not fit
    /// the 32-bit length fields, or a storage error from the backend.
    pub fn append(&mut self, tag: FrameTag, payload: &[u8]) -> RbfResult<Address64> {
        self.append_with_status(tag, payload, false)
    }

    /// Appends a complete Tombstone-status frame in one pass.
    ///
    /// A tombstone marks logical deletion of some earlier logical entity;
    /// reconciling it against prior frames is the caller's concern. On
    /// the wire it is an ordinary, fully validatable frame with the
    /// tombstone bit set in its status fill bytes, and scanners surface
    /// it like any other frame.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Framer::append`].
    pub fn append_tombstone(&mut self, tag: FrameTag, payload: &[u8]) -> RbfResult<Address64> {
        self.append_with_status(tag, payload, true)
    }

    fn append_with_status(
        &mut self,
        tag: FrameTag,
        payload: &[u8],
        tombstone: bool,
    ) -> RbfResult<Address64> {
        let payload_len = payload.len() as u64;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(RbfError::FrameTooLarge { payload_len });
        }

        let status_len = status_length(payload_len);
        let frame_len = frame_length(payload_len);
        let len_bytes = (frame_len as u32).to_le_bytes();
        let status = FrameStatus::new(status_len, tombstone);

        let mut buf = Vec::with_capacity(frame_len as usize + FENCE_LEN as usize);
        buf.extend_from_slice(&len_bytes);
        buf.extend_from_slice(&tag.as_u32().to_le_bytes());
        buf.extend_from_slice(payload);
        buf.resize(buf.len() + status_len as usize, status.as_byte());
        buf.extend_from_slice(&len_bytes);

        // CRC covers tag through TailLen; HeadLen and the fences stay out
        let crc = Crc32c::compute(&buf[4..]);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&FENCE_BYTES);

        let start = self.position;
        self.backend.append(&buf)?;
        self.position += buf.len() as u64;

        Ok(Address64::new(start))
    }

    /// Opens a streaming builder for a frame with the given tag.
    ///
    /// The builder borrows the framer mutably until it is committed or
    /// dropped, so opening a second builder - or appending while one is
    /// open - does not compile.
    pub fn begin_frame(&mut self, tag: FrameTag) -> FrameBuilder<'_, B> {
        FrameBuilder::new(self, tag)
    }

    /// Flushes buffered bytes to the backend.
    ///
    /// Carries no fsync guarantee; ordering across files is the caller's
    /// responsibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend flush fails.
    pub fn flush(&mut self) -> RbfResult<()> {
        self.backend.flush()?;
        Ok(())
    }

    /// Returns a shared reference to the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consumes the framer and returns the backend.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.backend
    }
}

impl<B: StorageBackend> std::fmt::Debug for Framer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framer")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
