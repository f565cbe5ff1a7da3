use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{IceCandidate, SessionDescription};

/// Requests an external control surface (HTTP, CLI, ...) translates into
/// operations on the streaming core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Start the capture/encode/fan-out loop
    Start,

    /// Stop the loop
    Stop,

    /// Register a new viewer
    AddPeer { peer_id: String },

    /// Remove a viewer and release its state
    RemovePeer { peer_id: String },

    /// Set or overwrite a peer's local session description
    SetLocalSdp {
        peer_id: String,
        sdp: SessionDescription,
    },

    /// Set or overwrite a peer's remote session description
    SetRemoteSdp {
        peer_id: String,
        sdp: SessionDescription,
    },

    /// Append a transport hint to a peer's candidate list
    AddIceCandidate {
        peer_id: String,
        candidate: IceCandidate,
    },

    /// Fetch a peer's delivery statistics
    GetPeerStats { peer_id: String },

    /// Fetch the current encoder bitrate
    GetEncoderConfig,

    /// Replace the encoder bitrate
    SetEncoderConfig { bitrate_kbps: u32 },

    /// Fetch pipeline-wide aggregate statistics
    GetPipelineStats,
}

/// Events the streaming core publishes for external logging and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The tick loop began running
    Started { stream_id: Uuid },

    /// The tick loop halted
    Stopped { stream_id: Uuid },

    /// A viewer was registered
    PeerAdded { peer_id: String },

    /// A viewer was removed
    PeerRemoved { peer_id: String },

    /// A peer completed negotiation and became eligible for delivery
    PeerNegotiated { peer_id: String },

    /// A tick was abandoned because encoding failed
    EncodeFailed { sequence: u64, reason: String },

    /// One encoded frame was offered to every registered peer
    FrameBroadcast {
        sequence: u64,
        encoded_bytes: usize,
        peers_delivered: usize,
        peers_skipped: usize,
    },

    /// The encoder bitrate was replaced
    ConfigUpdated { bitrate_kbps: u32 },
}
