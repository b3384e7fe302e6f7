//! Tail-to-head scan iterator.

use crate::layout::{align_down, is_aligned, FENCE_LEN, MIN_FRAME_LEN};
use super::{RbfFrame, Scanner};

/// Lazy iterator over the valid frames of a log, newest first.
///
/// State is a single cursor holding the position of the fence candidate
/// currently under examination. A failed probe moves the cursor back 4
/// bytes; a validated frame moves it to the fence preceding that frame in
/// one jump. The walk ends at the Genesis Fence.
#[derive(Debug)]
pub struct ScanReverse<'a> {
    scanner: Scanner<'a>,
    fence_pos: u64,
}

impl<'a> ScanReverse<'a> {
    pub(super) fn new(scanner: Scanner<'a>) -> Self {
        let size = scanner.source_size();
        let fence_pos = if size < FENCE_LEN {
            0
        } else {
            align_down(size - FENCE_LEN)
        };
        Self { scanner, fence_pos }
    }

    /// Probes for a frame whose trailing fence sits at `fence_pos`.
    ///
    /// Returns the frame and the position of its preceding fence, or
    /// `None` if anything about the candidate fails to validate.
    fn probe(&self, fence_pos: u64) -> Option<(RbfFrame, u64)> {
        let scanner = &self.scanner;
        if !scanner.fence_at(fence_pos) {
            return None;
        }

        let record_end = fence_pos;
        if record_end < FENCE_LEN + MIN_FRAME_LEN {
            return None;
        }

        let tail_len = u64::from(scanner.read_u32(record_end - 8)?);
        let frame_start = record_end.checked_sub(tail_len)?;
        if frame_start < FENCE_LEN || !is_aligned(frame_start) {
            return None;
        }

        let prev_fence = frame_start - FENCE_LEN;
        if !scanner.fence_at(prev_fence) {
            return None;
        }

        let head_len = u64::from(scanner.read_u32(frame_start)?);
        if head_len != tail_len || !is_aligned(head_len) || head_len < MIN_FRAME_LEN {
            return None;
        }

        let frame = scanner.validate_body(frame_start, record_end)?;
        Some((frame, prev_fence))
    }
}

impl Iterator for ScanReverse<'_> {
    type Item = RbfFrame;

    fn next(&mut self) -> Option<RbfFrame> {
        while self.fence_pos > 0 {
            match self.probe(self.fence_pos) {
                Some((frame, prev_fence)) => {
                    self.fence_pos = prev_fence;
                    return Some(frame);
                }
                // Resync: a failed probe costs exactly 4 bytes of
                // backward movement
                None => self.fence_pos -= 4,
            }
        }
        None
    }
}
