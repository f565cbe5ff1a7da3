//! Peer connections and the registry that owns them.

mod connection;
mod registry;

pub use connection::{NegotiationState, PeerConnection};
pub use registry::{BroadcastOutcome, PeerRegistry};
