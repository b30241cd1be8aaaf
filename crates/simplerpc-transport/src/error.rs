/// Errors produced while parsing an endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The string has no `://` scheme separator.
    #[error("missing scheme separator in {0:?} (expected scheme://host:port)")]
    MissingScheme(String),

    /// The scheme before `://` is empty.
    #[error("empty scheme in {0:?}")]
    EmptyScheme(String),

    /// The host between `://` and `:` is empty.
    #[error("empty host in {0:?}")]
    EmptyHost(String),

    /// The authority has no `:port` part.
    #[error("missing port in {0:?}")]
    MissingPort(String),

    /// The port is not a decimal number in `0..=65535`.
    #[error("invalid port {port:?} in {url:?}")]
    InvalidPort { url: String, port: String },
}

/// Errors that can occur in TCP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
