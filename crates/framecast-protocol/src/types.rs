use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session description a peer exchanges to agree on media parameters
/// before any frame may flow. The content is treated as opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDescription(pub String);

impl SessionDescription {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self(sdp.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionDescription {
    fn from(sdp: &str) -> Self {
        Self(sdp.to_string())
    }
}

/// Transport-reachability hint exchanged during negotiation.
/// Carried as opaque data; this layer performs no validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
        }
    }
}

/// How far a peer's negotiation has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationPhase {
    #[default]
    Created,
    LocalOffered,
    RemoteOffered,
    Negotiated,
}

/// Lifecycle state of the streaming pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Stopped,
    Running,
}

/// Per-peer delivery statistics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStatsData {
    pub peer_id: String,
    pub negotiation: NegotiationPhase,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub last_frame_at: Option<DateTime<Utc>>,
}

/// Pipeline-wide aggregate statistics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatsData {
    pub stream_id: Uuid,
    pub state: PipelineState,
    pub peer_count: usize,
    pub frames_captured: u64,
    pub frames_encoded: u64,
    pub encode_failures: u64,
    pub bytes_produced: u64,
    pub frames_delivered: u64,
    /// Moving average of capture-to-delivery latency in milliseconds
    pub latency_ms: f64,
}
