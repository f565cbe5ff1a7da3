//! Peer registry
//!
//! Owns every peer connection, keyed by peer id. Membership lives behind
//! the outer lock; each peer carries its own lock, so delivering to one
//! peer does not serialize against mutating another.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use framecast_media::EncodedFrame;

use super::connection::PeerConnection;
use crate::error::{Error, Result};

/// Outcome of one fan-out pass over the registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Peers whose counters were updated with this frame
    pub delivered: usize,
    /// Peers skipped because negotiation is incomplete
    pub skipped: usize,
}

pub struct PeerRegistry {
    peers: RwLock<HashMap<String, Arc<RwLock<PeerConnection>>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new peer with empty negotiation state.
    pub async fn add_peer(&self, id: &str) -> Result<Arc<RwLock<PeerConnection>>> {
        let mut peers = self.peers.write().await;
        if peers.contains_key(id) {
            return Err(Error::DuplicatePeer(id.to_string()));
        }

        let peer = Arc::new(RwLock::new(PeerConnection::new(id)));
        peers.insert(id.to_string(), peer.clone());
        tracing::info!(peer = id, "peer added");
        Ok(peer)
    }

    /// Remove a peer and release all its state.
    pub async fn remove_peer(&self, id: &str) -> Result<()> {
        match self.peers.write().await.remove(id) {
            Some(_) => {
                tracing::info!(peer = id, "peer removed");
                Ok(())
            }
            None => Err(Error::PeerNotFound(id.to_string())),
        }
    }

    /// Look up a peer. The handle is valid for the scope of the lookup;
    /// a removed peer stops receiving deliveries on the next tick.
    pub async fn get(&self, id: &str) -> Result<Arc<RwLock<PeerConnection>>> {
        self.peers
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::PeerNotFound(id.to_string()))
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn peer_ids(&self) -> Vec<String> {
        self.peers.read().await.keys().cloned().collect()
    }

    /// Deliver one encoded frame to every negotiated peer.
    ///
    /// Membership is snapshotted up front, so peers added or removed
    /// while the walk runs affect the next tick, not this one. Peers
    /// still negotiating are skipped and stay pending.
    pub async fn broadcast_frame(&self, frame: &EncodedFrame) -> BroadcastOutcome {
        let targets: Vec<(String, Arc<RwLock<PeerConnection>>)> = self
            .peers
            .read()
            .await
            .iter()
            .map(|(id, peer)| (id.clone(), peer.clone()))
            .collect();

        let mut outcome = BroadcastOutcome::default();
        for (id, peer) in targets {
            let mut peer = peer.write().await;
            if !peer.can_receive_frame() {
                outcome.skipped += 1;
                continue;
            }
            match peer.record_delivered(frame) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.skipped += 1;
                    tracing::warn!(peer = %id, error = %e, "frame delivery failed");
                }
            }
        }
        outcome
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use framecast_protocol::SessionDescription;

    fn encoded(sequence: u64) -> EncodedFrame {
        EncodedFrame {
            sequence,
            captured_at: Utc::now(),
            data: vec![0xcd; 200],
            encode_duration: std::time::Duration::from_micros(50),
        }
    }

    async fn negotiate(registry: &PeerRegistry, id: &str) {
        let peer = registry.get(id).await.unwrap();
        let mut peer = peer.write().await;
        peer.set_local_sdp(SessionDescription::new("local"));
        peer.set_remote_sdp(SessionDescription::new("remote"));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let registry = PeerRegistry::new();
        registry.add_peer("viewer-1").await.unwrap();

        let result = registry.add_peer("viewer-1").await;
        assert!(matches!(result, Err(Error::DuplicatePeer(_))));
        assert_eq!(registry.peer_count().await, 1);
    }

    #[tokio::test]
    async fn missing_ids_are_distinguishable() {
        let registry = PeerRegistry::new();

        assert!(matches!(
            registry.get("ghost").await,
            Err(Error::PeerNotFound(_))
        ));
        assert!(matches!(
            registry.remove_peer("ghost").await,
            Err(Error::PeerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn removed_peers_reject_further_operations() {
        let registry = PeerRegistry::new();
        registry.add_peer("viewer-1").await.unwrap();
        registry.remove_peer("viewer-1").await.unwrap();

        assert!(matches!(
            registry.get("viewer-1").await,
            Err(Error::PeerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn broadcast_skips_unnegotiated_peers() {
        let registry = PeerRegistry::new();
        registry.add_peer("ready").await.unwrap();
        registry.add_peer("pending").await.unwrap();
        negotiate(&registry, "ready").await;

        let outcome = registry.broadcast_frame(&encoded(1)).await;
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.skipped, 1);

        let pending = registry.get("pending").await.unwrap();
        assert_eq!(pending.read().await.frames_sent(), 0);
    }

    #[tokio::test]
    async fn removing_one_peer_leaves_the_others_counters() {
        let registry = PeerRegistry::new();
        registry.add_peer("a").await.unwrap();
        registry.add_peer("b").await.unwrap();
        negotiate(&registry, "a").await;
        negotiate(&registry, "b").await;

        registry.broadcast_frame(&encoded(1)).await;
        registry.broadcast_frame(&encoded(2)).await;
        registry.remove_peer("a").await.unwrap();
        registry.broadcast_frame(&encoded(3)).await;

        let b = registry.get("b").await.unwrap();
        assert_eq!(b.read().await.frames_sent(), 3);
    }
}
