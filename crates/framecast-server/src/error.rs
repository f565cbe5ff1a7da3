use framecast_media::EncodeError;
use thiserror::Error;

/// Errors surfaced by the streaming core.
///
/// Every variant is a local, recoverable condition returned to the
/// immediate caller; none is fatal to the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// A peer with this id is already registered
    #[error("duplicate peer id: {0}")]
    DuplicatePeer(String),

    /// No peer with this id is registered
    #[error("peer not found: {0}")]
    PeerNotFound(String),

    /// Frame delivery attempted before both session descriptions are set
    #[error("negotiation incomplete for peer {0}")]
    NegotiationIncomplete(String),

    /// Frame encoding failed
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl Error {
    /// True when the error concerns a specific peer rather than the
    /// pipeline as a whole.
    pub fn is_peer_error(&self) -> bool {
        matches!(
            self,
            Error::DuplicatePeer(_) | Error::PeerNotFound(_) | Error::NegotiationIncomplete(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
