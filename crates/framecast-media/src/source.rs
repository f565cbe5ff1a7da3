//! Capture source seam
//!
//! Real display capture lives behind `FrameSource`; the pipeline pulls one
//! frame per tick and treats an empty pull as "nothing new on screen".

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::frame::RawFrame;

/// A pull-based producer of timestamped raw frames.
pub trait FrameSource: Send {
    /// Non-blocking pull of the next captured frame, if one is ready.
    fn try_pull_frame(&mut self) -> Option<RawFrame>;
}

/// Deterministic test-pattern source producing fixed-size frames.
///
/// Used by the demo binary and tests in place of real display capture.
/// An optional frame limit makes it run dry after a known number of pulls.
pub struct SyntheticSource {
    frame_len: usize,
    next_sequence: u64,
    limit: Option<u64>,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(frame_len: usize) -> Self {
        Self::seeded(frame_len, 0x05ca_57ed)
    }

    pub fn seeded(frame_len: usize, seed: u64) -> Self {
        Self {
            frame_len,
            next_sequence: 0,
            limit: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stop producing after `limit` frames.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl FrameSource for SyntheticSource {
    fn try_pull_frame(&mut self) -> Option<RawFrame> {
        if let Some(limit) = self.limit {
            if self.next_sequence >= limit {
                return None;
            }
        }

        let mut data = vec![0u8; self.frame_len];
        self.rng.fill_bytes(&mut data);

        let frame = RawFrame::new(self.next_sequence, data);
        self.next_sequence += 1;
        Some(frame)
    }
}
