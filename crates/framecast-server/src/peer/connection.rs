//! Per-viewer connection state
//!
//! Each viewer negotiates by exchanging session descriptions; frames flow
//! only once both directions are set. ICE candidates accumulate alongside
//! the exchange and do not gate it.

use chrono::{DateTime, Utc};

use framecast_media::EncodedFrame;
use framecast_protocol::{IceCandidate, NegotiationPhase, PeerStatsData, SessionDescription};

use crate::error::{Error, Result};

/// Negotiation progress for a single peer.
///
/// The session descriptions live inside the variants, so a connection can
/// only be `Negotiated` when both descriptions are actually present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationState {
    Created,
    LocalOffered(SessionDescription),
    RemoteOffered(SessionDescription),
    Negotiated {
        local: SessionDescription,
        remote: SessionDescription,
    },
}

impl NegotiationState {
    pub fn phase(&self) -> NegotiationPhase {
        match self {
            NegotiationState::Created => NegotiationPhase::Created,
            NegotiationState::LocalOffered(_) => NegotiationPhase::LocalOffered,
            NegotiationState::RemoteOffered(_) => NegotiationPhase::RemoteOffered,
            NegotiationState::Negotiated { .. } => NegotiationPhase::Negotiated,
        }
    }
}

/// A single viewer's connection: negotiation state plus delivery counters.
#[derive(Debug)]
pub struct PeerConnection {
    id: String,
    state: NegotiationState,
    ice_candidates: Vec<IceCandidate>,
    frames_sent: u64,
    bytes_sent: u64,
    last_frame_at: Option<DateTime<Utc>>,
}

impl PeerConnection {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: NegotiationState::Created,
            ice_candidates: Vec::new(),
            frames_sent: 0,
            bytes_sent: 0,
            last_frame_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    pub fn ice_candidates(&self) -> &[IceCandidate] {
        &self.ice_candidates
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn last_frame_at(&self) -> Option<DateTime<Utc>> {
        self.last_frame_at
    }

    /// Set or overwrite the local session description. Always succeeds.
    pub fn set_local_sdp(&mut self, sdp: SessionDescription) {
        use NegotiationState::*;
        self.state = match std::mem::replace(&mut self.state, Created) {
            Created | LocalOffered(_) => LocalOffered(sdp),
            RemoteOffered(remote) | Negotiated { remote, .. } => Negotiated { local: sdp, remote },
        };
        tracing::debug!(peer = %self.id, phase = ?self.state.phase(), "local description set");
    }

    /// Set or overwrite the remote session description. Always succeeds.
    pub fn set_remote_sdp(&mut self, sdp: SessionDescription) {
        use NegotiationState::*;
        self.state = match std::mem::replace(&mut self.state, Created) {
            Created | RemoteOffered(_) => RemoteOffered(sdp),
            LocalOffered(local) | Negotiated { local, .. } => Negotiated { local, remote: sdp },
        };
        tracing::debug!(peer = %self.id, phase = ?self.state.phase(), "remote description set");
    }

    /// Append a transport hint. Candidates are opaque and never gate
    /// negotiation.
    pub fn add_ice_candidate(&mut self, candidate: IceCandidate) {
        self.ice_candidates.push(candidate);
    }

    /// True once both session descriptions are set.
    pub fn can_receive_frame(&self) -> bool {
        matches!(self.state, NegotiationState::Negotiated { .. })
    }

    /// Record delivery of one encoded frame to this peer.
    ///
    /// Fails without touching any state when negotiation is incomplete.
    pub fn record_delivered(&mut self, frame: &EncodedFrame) -> Result<()> {
        if !self.can_receive_frame() {
            return Err(Error::NegotiationIncomplete(self.id.clone()));
        }
        self.frames_sent += 1;
        self.bytes_sent += frame.size() as u64;
        self.last_frame_at = Some(Utc::now());
        Ok(())
    }

    pub fn stats(&self) -> PeerStatsData {
        PeerStatsData {
            peer_id: self.id.clone(),
            negotiation: self.state.phase(),
            frames_sent: self.frames_sent,
            bytes_sent: self.bytes_sent,
            last_frame_at: self.last_frame_at,
        }
    }
}
