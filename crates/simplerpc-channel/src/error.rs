use crate::chain::ChainError;

/// Errors that can occur inside the client and server pipelines.
///
/// None of these reach a caller directly: the client formatter and the server
/// transport convert them into fault results at the boundary where they are
/// detected.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Transport-level error (connect, accept, socket I/O).
    #[error("transport error: {0}")]
    Transport(#[from] simplerpc_transport::TransportError),

    /// Frame or value codec error, including unsupported value kinds.
    #[error("frame error: {0}")]
    Frame(#[from] simplerpc_frame::FrameError),

    /// The endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] simplerpc_transport::ParseError),

    /// The endpoint does not name a remote object.
    #[error("endpoint {0} names no remote object")]
    MissingObjectUri(String),

    /// The peer sent something the protocol does not allow here.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The registry could not resolve the request's target.
    #[error("protocol violation: no object registered at {0:?}")]
    TargetNotFound(String),

    /// The stage list could not be turned into a chain.
    #[error("pipeline composition failed: {0}")]
    Chain(#[from] ChainError),

    /// A pipeline stage panicked while handling a call.
    #[error("stage panicked: {0}")]
    Panic(String),

    /// `start()` was called on a listener that has already been stopped.
    #[error("listener was stopped and cannot be restarted")]
    ListenerRetired,
}

impl ChannelError {
    /// Whether this error is a protocol violation by the peer.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_) | Self::TargetNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
