//! Media processing primitives for Framecast
//!
//! This crate provides the pieces the streaming pipeline composes:
//! - Raw and encoded frame types
//! - The `FrameEncoder` capability trait with a software implementation
//! - The `FrameSource` capture seam with a synthetic test-pattern source

pub mod encoder;
pub mod frame;
pub mod source;

pub use encoder::{
    EncodeError, EncoderConfig, FrameEncoder, MAX_BITRATE_KBPS, MIN_BITRATE_KBPS, SoftwareEncoder,
};
pub use frame::{EncodedFrame, RawFrame};
pub use source::{FrameSource, SyntheticSource};
