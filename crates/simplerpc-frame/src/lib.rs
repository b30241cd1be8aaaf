//! Wire codec for simplerpc: typed values, invocation bodies and framing.
//!
//! Every message on the wire is framed with an 8-byte header:
//! - A 2-byte magic number ("SR") for stream synchronization
//! - A 1-byte protocol version
//! - A 1-byte message kind (0 = request, 1 = response)
//! - A 4-byte little-endian body length
//!
//! Request bodies carry the target object URI ahead of the invocation
//! payload. Payloads are built from a closed set of [`TypedValue`] kinds;
//! there is no generic object encoder at this layer.

pub mod codec;
pub mod error;
pub mod kind;
pub mod message;
pub mod reader;
pub mod value;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
    PROTOCOL_VERSION,
};
pub use error::{FrameError, Result};
pub use kind::MessageKind;
pub use message::{
    decode_request, decode_result, encode_request, encode_result, InvocationRequest,
    InvocationResult, RemoteFault,
};
pub use reader::FrameReader;
pub use value::{decode_value, encode_value, TypedValue};
pub use writer::FrameWriter;
