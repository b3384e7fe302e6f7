//! Incremental CRC32C (Castagnoli) accumulator.
//!
//! Frame checksums are computed over bytes as they are produced, so
//! neither the streaming writer nor the scanner ever has to materialize a
//! full payload just to checksum it.

use crc::{Crc, Digest, CRC_32_ISCSI};
use std::fmt;

static CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// A running CRC32C computation.
///
/// Feed bytes with [`Crc32c::update`] in the order they appear on the
/// wire, then take the value with [`Crc32c::finish`]. For spans that are
/// already in memory, [`Crc32c::compute`] is the one-shot equivalent.
pub struct Crc32c {
    digest: Digest<'static, u32>,
}

impl Crc32c {
    /// Starts a new accumulation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            digest: CASTAGNOLI.digest(),
        }
    }

    /// Absorbs the next bytes of the span.
    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    /// Finalizes and returns the checksum.
    #[must_use]
    pub fn finish(self) -> u32 {
        self.digest.finalize()
    }

    /// Computes the checksum of a fully materialized span in one pass.
    #[must_use]
    pub fn compute(bytes: &[u8]) -> u32 {
        CASTAGNOLI.checksum(bytes)
    }
}

impl Default for Crc32c {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Crc32c {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crc32c").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // Standard CRC32C check value
        assert_eq!(Crc32c::compute(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn empty_span() {
        assert_eq!(Crc32c::compute(b""), 0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0..=255).cycle().take(10_000).collect();

        let mut crc = Crc32c::new();
        for chunk in data.chunks(97) {
            crc.update(chunk);
        }

        assert_eq!(crc.finish(), Crc32c::compute(&data));
    }

    #[test]
    fn split_point_does_not_matter() {
        let data = b"the quick brown fox jumps over the lazy dog";
        for split in 0..data.len() {
            let mut crc = Crc32c::new();
            crc.update(&data[..split]);
            crc.update(&data[split..]);
            assert_eq!(crc.finish(), Crc32c::compute(data));
        }
    }
}
