//! Framecast streaming core
//!
//! Wires display capture, per-frame encoding, and fan-out delivery to
//! negotiated viewers under start/stop lifecycle control. The module
//! layout mirrors the flow: `peer` holds negotiation state and the
//! registry, `pipeline` runs the tick loop, `events` carries failures and
//! statistics out to observers.

pub mod error;
pub mod events;
pub mod peer;
pub mod pipeline;
pub mod state;

pub use error::{Error, Result};
pub use peer::{NegotiationState, PeerConnection, PeerRegistry};
pub use pipeline::{StreamPipeline, TickOutcome};

use std::sync::Arc;

use framecast_media::{EncoderConfig, SoftwareEncoder, SyntheticSource};

/// Build a pipeline wired to the synthetic capture source and the
/// software encoder described by `config`.
pub fn create_pipeline(config: &state::Config) -> anyhow::Result<StreamPipeline> {
    let source = Box::new(SyntheticSource::new(config.frame_bytes));
    let encoder = Arc::new(SoftwareEncoder::new());
    let encoder_config = EncoderConfig::new(config.bitrate_kbps)?;

    Ok(StreamPipeline::new(
        source,
        encoder,
        encoder_config,
        config.target_fps,
    ))
}
