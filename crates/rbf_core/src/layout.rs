//! Binary layout constants and geometry formulas.
//!
//! A frame occupies `HeadLen | FrameTag | Payload | FrameStatus | TailLen |
//! CRC32C`, delimited by a fence on both sides. All multi-byte integers are
//! little-endian. Every frame is a multiple of 4 bytes long and starts at a
//! 4-byte-aligned offset; the status fill region is sized to force this.

/// The fence magic delimiting frames.
///
/// Compatibility constant: writer and reader must agree on it, nothing
/// else about the format depends on the particular value. Read as a
/// little-endian u32 it is `0x4642_52C7`, which has its low two bits set
/// and therefore can never be mistaken for a valid `HeadLen` (those are
/// always multiples of 4).
pub const FENCE_BYTES: [u8; 4] = [0xC7, b'R', b'B', b'F'];

/// Length of a fence in bytes.
pub const FENCE_LEN: u64 = 4;

/// Fixed per-frame overhead: HeadLen + FrameTag + TailLen + CRC32C.
pub const FRAME_OVERHEAD: u64 = 16;

/// Smallest legal frame length: empty payload plus a full 4-byte status
/// fill region.
pub const MIN_FRAME_LEN: u64 = FRAME_OVERHEAD + 4;

/// Offset of the frame tag within a frame.
pub const FRAME_TAG_OFFSET: u64 = 4;

/// Offset of the payload within a frame.
pub const PAYLOAD_OFFSET: u64 = 8;

/// Largest payload that still yields a frame length representable in the
/// 32-bit head/tail length fields.
pub const MAX_PAYLOAD_LEN: u64 = u32::MAX as u64 - FRAME_OVERHEAD - 4;

/// Returns the status fill length for a payload of `payload_len` bytes.
///
/// Always in `1..=4`, chosen so that payload plus status is a multiple
/// of 4. The repetition of the status byte across this region is an
/// integrity check independent of the CRC.
#[must_use]
pub const fn status_length(payload_len: u64) -> u64 {
    4 - (payload_len % 4)
}

/// Returns the total frame length for a payload of `payload_len` bytes.
#[must_use]
pub const fn frame_length(payload_len: u64) -> u64 {
    FRAME_OVERHEAD + payload_len + status_length(payload_len)
}

/// Whether `value` is 4-byte aligned.
#[must_use]
pub const fn is_aligned(value: u64) -> bool {
    value % 4 == 0
}

/// Rounds `value` down to the nearest multiple of 4.
#[must_use]
pub const fn align_down(value: u64) -> u64 {
    value & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_length_covers_all_remainders() {
        assert_eq!(status_length(0), 4);
        assert_eq!(status_length(1), 3);
        assert_eq!(status_length(2), 2);
        assert_eq!(status_length(3), 1);
        assert_eq!(status_length(4), 4);
        assert_eq!(status_length(1023), 1);
    }

    #[test]
    fn frame_length_is_always_aligned() {
        for payload_len in 0..64 {
            let len = frame_length(payload_len);
            assert!(is_aligned(len), "frame_length({payload_len}) = {len}");
            assert!(len >= MIN_FRAME_LEN);
        }
    }

    #[test]
    fn empty_payload_gives_minimum_frame() {
        assert_eq!(frame_length(0), MIN_FRAME_LEN);
        assert_eq!(MIN_FRAME_LEN, 20);
    }

    #[test]
    fn alignment_helpers() {
        assert!(is_aligned(0));
        assert!(is_aligned(4));
        assert!(!is_aligned(6));
        assert_eq!(align_down(0), 0);
        assert_eq!(align_down(7), 4);
        assert_eq!(align_down(8), 8);
    }

    #[test]
    fn fence_cannot_be_a_valid_head_len() {
        let as_len = u32::from_le_bytes(FENCE_BYTES);
        assert_ne!(as_len % 4, 0);
    }
}
