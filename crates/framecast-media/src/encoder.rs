//! Frame encoder abstraction
//!
//! The pipeline talks to a `FrameEncoder` capability so the software
//! implementation here can be swapped for a hardware codec without
//! touching pipeline or peer logic.

use std::time::Instant;

use thiserror::Error;

use crate::frame::{EncodedFrame, RawFrame};

/// Lowest bitrate an encoder configuration accepts, in kilobits per second.
pub const MIN_BITRATE_KBPS: u32 = 100;
/// Highest bitrate an encoder configuration accepts, in kilobits per second.
pub const MAX_BITRATE_KBPS: u32 = 50_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The raw frame cannot be encoded (empty or malformed payload)
    #[error("invalid input frame: {0}")]
    InvalidInput(String),

    /// The bitrate lies outside the accepted range
    #[error("invalid encoder config: bitrate {0} kbps outside [{MIN_BITRATE_KBPS}, {MAX_BITRATE_KBPS}]")]
    InvalidConfig(u32),
}

/// Encoder bitrate configuration.
///
/// Constructed through `new`, which rejects bitrates outside
/// [`MIN_BITRATE_KBPS`, `MAX_BITRATE_KBPS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    pub bitrate_kbps: u32,
}

impl EncoderConfig {
    pub fn new(bitrate_kbps: u32) -> Result<Self, EncodeError> {
        let config = Self { bitrate_kbps };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EncodeError> {
        if !(MIN_BITRATE_KBPS..=MAX_BITRATE_KBPS).contains(&self.bitrate_kbps) {
            return Err(EncodeError::InvalidConfig(self.bitrate_kbps));
        }
        Ok(())
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        // 2.5 Mbps, a reasonable default for 1080p-class screen content
        Self {
            bitrate_kbps: 2_500,
        }
    }
}

/// Compressor contract: one raw frame in, one encoded frame out.
///
/// Implementations hold no per-call state; failure produces no partial
/// output.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &RawFrame, config: &EncoderConfig) -> Result<EncodedFrame, EncodeError>;

    /// Identifier for logs.
    fn name(&self) -> &str;
}

/// Software encoder with simulated compression.
///
/// Output size is a deterministic function of input size and bitrate:
/// roughly a 12x reduction at the bottom of the bitrate range, easing to
/// 8x at the top, so a higher bitrate yields a larger output for the same
/// input. Payload bytes are a fold of the input, so output content tracks
/// input content.
#[derive(Debug, Default)]
pub struct SoftwareEncoder;

impl SoftwareEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameEncoder for SoftwareEncoder {
    fn encode(&self, frame: &RawFrame, config: &EncoderConfig) -> Result<EncodedFrame, EncodeError> {
        config.validate()?;
        if frame.is_empty() {
            return Err(EncodeError::InvalidInput("empty frame payload".to_string()));
        }

        let started = Instant::now();
        let data = compress(&frame.data, config.bitrate_kbps);
        let encode_duration = started.elapsed();

        tracing::trace!(
            sequence = frame.sequence,
            raw_bytes = frame.len(),
            encoded_bytes = data.len(),
            "frame encoded"
        );

        Ok(EncodedFrame {
            sequence: frame.sequence,
            captured_at: frame.captured_at,
            data,
            encode_duration,
        })
    }

    fn name(&self) -> &str {
        "software-sim"
    }
}

/// Fold the input into a bitrate-scaled output buffer.
fn compress(input: &[u8], bitrate_kbps: u32) -> Vec<u8> {
    let span = (MAX_BITRATE_KBPS - MIN_BITRATE_KBPS) as usize;
    let above_min = (bitrate_kbps - MIN_BITRATE_KBPS) as usize;
    // len/12 at the minimum bitrate, growing linearly to len/8 at the maximum
    let target = (input.len() / 12 + (input.len() / 24) * above_min / span).max(1);

    let mut out = vec![0u8; target];
    for (i, byte) in input.iter().enumerate() {
        let slot = i % target;
        out[slot] = out[slot].wrapping_add(*byte).rotate_left(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame_of(len: usize) -> RawFrame {
        RawFrame::new(1, (0..len).map(|i| (i % 251) as u8).collect())
    }

    #[test]
    fn config_rejects_out_of_range_bitrates() {
        assert_eq!(EncoderConfig::new(0), Err(EncodeError::InvalidConfig(0)));
        assert_eq!(
            EncoderConfig::new(60_000),
            Err(EncodeError::InvalidConfig(60_000))
        );
        assert!(EncoderConfig::new(MIN_BITRATE_KBPS).is_ok());
        assert!(EncoderConfig::new(MAX_BITRATE_KBPS).is_ok());
    }

    #[test]
    fn encode_rejects_empty_frames() {
        let encoder = SoftwareEncoder::new();
        let empty = RawFrame::new(1, Vec::new());
        let result = encoder.encode(&empty, &EncoderConfig::default());
        assert!(matches!(result, Err(EncodeError::InvalidInput(_))));
    }

    #[test]
    fn encode_shrinks_payload_roughly_tenfold() {
        let encoder = SoftwareEncoder::new();
        let raw = frame_of(120_000);
        let encoded = encoder.encode(&raw, &EncoderConfig::default()).unwrap();

        assert!(!encoded.data.is_empty());
        assert!(encoded.size() < raw.len());
        let ratio = raw.len() as f64 / encoded.size() as f64;
        assert!((8.0..=13.0).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn higher_bitrate_yields_larger_output() {
        let encoder = SoftwareEncoder::new();
        let raw = frame_of(10_000);

        let low = encoder
            .encode(&raw, &EncoderConfig::new(MIN_BITRATE_KBPS).unwrap())
            .unwrap();
        let mid = encoder
            .encode(&raw, &EncoderConfig::new(25_000).unwrap())
            .unwrap();
        let high = encoder
            .encode(&raw, &EncoderConfig::new(MAX_BITRATE_KBPS).unwrap())
            .unwrap();

        assert!(low.size() < mid.size());
        assert!(mid.size() < high.size());
        assert!(high.size() < raw.len());
    }

    #[test]
    fn encode_is_deterministic_for_same_input() {
        let encoder = SoftwareEncoder::new();
        let raw = frame_of(4_096);
        let config = EncoderConfig::default();

        let first = encoder.encode(&raw, &config).unwrap();
        let second = encoder.encode(&raw, &config).unwrap();
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn encode_stays_under_50ms_for_representative_frame() {
        let encoder = SoftwareEncoder::new();
        let raw = frame_of(10_000);
        let config = EncoderConfig::new(MIN_BITRATE_KBPS).unwrap();

        let started = Instant::now();
        let encoded = encoder.encode(&raw, &config).unwrap();
        let elapsed = started.elapsed();

        assert!(!encoded.data.is_empty());
        assert!(encoded.size() < 10_000);
        assert!(elapsed < Duration::from_millis(50), "took {elapsed:?}");
        assert!(encoded.encode_duration < Duration::from_millis(50));
    }

    #[test]
    fn tiny_frames_still_produce_output() {
        let encoder = SoftwareEncoder::new();
        let raw = frame_of(3);
        let encoded = encoder.encode(&raw, &EncoderConfig::default()).unwrap();
        assert_eq!(encoded.size(), 1);
    }
}
