//! Frame types crossing the capture, encode, and delivery seams.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A captured display frame as produced by the capture source.
///
/// Immutable once produced; the sequence number increases monotonically
/// for the lifetime of the source.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    /// Opaque pixel payload
    pub data: Vec<u8>,
}

impl RawFrame {
    pub fn new(sequence: u64, data: Vec<u8>) -> Self {
        Self {
            sequence,
            captured_at: Utc::now(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A compressed frame ready for fan-out delivery.
///
/// Produced by an encoder and shared (not re-encoded) across every peer
/// that receives it.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Sequence number of the raw frame this was encoded from
    pub sequence: u64,
    /// Capture time of the originating raw frame
    pub captured_at: DateTime<Utc>,
    /// Compressed payload
    pub data: Vec<u8>,
    /// Wall-clock duration of the encode call
    pub encode_duration: Duration,
}

impl EncodedFrame {
    /// Compressed size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
