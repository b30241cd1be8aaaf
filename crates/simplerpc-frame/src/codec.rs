use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::MessageKind;
use crate::value::{get_string, put_string};

/// Frame header: magic (2) + version (1) + kind (1) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "SR" (0x53 0x52).
pub const MAGIC: [u8; 2] = [0x53, 0x52];

/// Wire protocol version written into every header.
pub const PROTOCOL_VERSION: u8 = 1;

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Request or response.
    pub kind: MessageKind,
    /// Target object URI. Present only on requests.
    pub target_uri: Option<String>,
    /// Encoded invocation body.
    pub payload: Bytes,
}

impl Frame {
    /// Create a request frame addressed to `target_uri`.
    pub fn request(target_uri: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Request,
            target_uri: Some(target_uri.into()),
            payload: payload.into(),
        }
    }

    /// Create a response frame.
    pub fn response(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Response,
            target_uri: None,
            payload: payload.into(),
        }
    }

    /// Number of body bytes following the header.
    pub fn body_len(&self) -> usize {
        let uri_len = self.target_uri.as_ref().map_or(0, |uri| 4 + uri.len());
        uri_len + self.payload.len()
    }

    /// The total wire size of this frame (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body_len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────────┬──────────┬─────────────┬──────────────────────────────┐
/// │ Magic (2B) │ Ver(1B) │ Kind(1B) │ Length      │ Body (Length bytes)          │
/// │ "SR"       │ 0x01    │ 0 = req  │ (4B LE)     │ req:  [uri: string][payload] │
/// │            │         │ 1 = resp │             │ resp: [payload]              │
/// └────────────┴─────────┴──────────┴─────────────┴──────────────────────────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let body_len = frame.body_len();
    let length = u32::try_from(body_len).map_err(|_| FrameError::PayloadTooLarge {
        size: body_len,
        max: u32::MAX as usize,
    })?;

    match (frame.kind, &frame.target_uri) {
        (MessageKind::Request, None) => {
            return Err(FrameError::malformed("request frame without target uri"));
        }
        (MessageKind::Response, Some(_)) => {
            return Err(FrameError::malformed("response frame with target uri"));
        }
        _ => {}
    }

    dst.reserve(HEADER_SIZE + body_len);
    dst.put_slice(&MAGIC);
    dst.put_u8(PROTOCOL_VERSION);
    dst.put_u8(frame.kind.as_byte());
    dst.put_u32_le(length);
    if let Some(uri) = &frame.target_uri {
        put_string(uri, dst)?;
    }
    dst.put_slice(&frame.payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }
    if src[2] != PROTOCOL_VERSION {
        return Err(FrameError::UnsupportedVersion(src[2]));
    }
    let kind = MessageKind::try_from(src[3])?;
    let body_len = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;

    if body_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: body_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + body_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let mut body = src.split_to(body_len).freeze();

    let target_uri = match kind {
        MessageKind::Request => Some(get_string(&mut body)?),
        MessageKind::Response => None,
    };

    Ok(Some(Frame {
        kind,
        target_uri,
        payload: body,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum body size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
