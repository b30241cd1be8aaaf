/// Errors that can occur during frame and value encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x5352 \"SR\")")]
    InvalidMagic,

    /// The frame header carries a protocol version this build does not speak.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// The frame header carries an unknown message kind byte.
    #[error("unknown message kind {0}")]
    UnknownKind(u8),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A value outside the closed set of wire kinds was offered for encoding.
    #[error("cannot encode value of kind {kind}")]
    Unsupported { kind: String },

    /// A typed value started with a tag outside the closed set.
    #[error("unknown value tag 0x{0:02x}")]
    UnknownTag(u8),

    /// The bytes do not form a valid body.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
