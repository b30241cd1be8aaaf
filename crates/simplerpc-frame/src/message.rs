//! Invocation request and result bodies.
//!
//! ```text
//! request:  [method: string][arg_count: i32 LE][arg: typed value]*
//! success:  [return: typed value][out_count: i32 LE][out arg: typed value]*
//! fault:    [exception message: typed value]
//! ```
//!
//! A response is a fault exactly when its first typed value carries the
//! exception tag.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::value::{decode_value, encode_value, get_i32, get_string, put_string, TypedValue};

/// A method call as it travels from caller to remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub method_name: String,
    pub arguments: Vec<TypedValue>,
}

impl InvocationRequest {
    pub fn new(method_name: impl Into<String>, arguments: Vec<TypedValue>) -> Self {
        Self {
            method_name: method_name.into(),
            arguments,
        }
    }

    /// Build a request from host values, failing on the first value outside
    /// the closed wire set.
    pub fn from_json(method_name: impl Into<String>, args: &[serde_json::Value]) -> Result<Self> {
        let arguments = args
            .iter()
            .map(TypedValue::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(method_name, arguments))
    }
}

/// Outcome of a remote call. Exactly one of the two forms is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    Return {
        return_value: TypedValue,
        out_arguments: Vec<TypedValue>,
    },
    Fault {
        message: String,
    },
}

impl InvocationResult {
    /// Successful result without out-arguments.
    pub fn returning(value: impl Into<TypedValue>) -> Self {
        Self::Return {
            return_value: value.into(),
            out_arguments: Vec::new(),
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }

    pub fn return_value(&self) -> Option<&TypedValue> {
        match self {
            Self::Return { return_value, .. } => Some(return_value),
            Self::Fault { .. } => None,
        }
    }

    pub fn fault_message(&self) -> Option<&str> {
        match self {
            Self::Fault { message } => Some(message),
            Self::Return { .. } => None,
        }
    }

    /// Split into the success payload or a [`RemoteFault`].
    pub fn into_result(self) -> std::result::Result<(TypedValue, Vec<TypedValue>), RemoteFault> {
        match self {
            Self::Return {
                return_value,
                out_arguments,
            } => Ok((return_value, out_arguments)),
            Self::Fault { message } => Err(RemoteFault { message }),
        }
    }
}

/// A failure reported by the far side of a call.
///
/// Only the message text survives the trip; the original error kind is not
/// reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("remote fault: {message}")]
pub struct RemoteFault {
    pub message: String,
}

/// Encode a request body.
pub fn encode_request(request: &InvocationRequest, dst: &mut BytesMut) -> Result<()> {
    put_string(&request.method_name, dst)?;
    put_count(request.arguments.len(), dst)?;
    for arg in &request.arguments {
        encode_value(arg, dst)?;
    }
    Ok(())
}

/// Decode a request body. The whole buffer must be consumed.
pub fn decode_request(mut src: Bytes) -> Result<InvocationRequest> {
    let method_name = get_string(&mut src)?;
    let arguments = decode_values(&mut src, "argument")?;
    ensure_consumed(&src)?;
    Ok(InvocationRequest {
        method_name,
        arguments,
    })
}

/// Encode a response body, success or fault.
///
/// A successful result whose return value is an exception message would be
/// read back as a fault, so it is rejected.
pub fn encode_result(result: &InvocationResult, dst: &mut BytesMut) -> Result<()> {
    match result {
        InvocationResult::Return {
            return_value,
            out_arguments,
        } => {
            if matches!(return_value, TypedValue::ExceptionMessage(_)) {
                return Err(FrameError::Unsupported {
                    kind: "exception message as return value".to_string(),
                });
            }
            encode_value(return_value, dst)?;
            put_count(out_arguments.len(), dst)?;
            for arg in out_arguments {
                encode_value(arg, dst)?;
            }
        }
        InvocationResult::Fault { message } => {
            encode_value(&TypedValue::ExceptionMessage(message.clone()), dst)?;
        }
    }
    Ok(())
}

/// Decode a response body. Success or fault is decided by the first tag.
pub fn decode_result(mut src: Bytes) -> Result<InvocationResult> {
    let result = match decode_value(&mut src)? {
        TypedValue::ExceptionMessage(message) => InvocationResult::Fault { message },
        return_value => InvocationResult::Return {
            return_value,
            out_arguments: decode_values(&mut src, "out argument")?,
        },
    };
    ensure_consumed(&src)?;
    Ok(result)
}

fn put_count(count: usize, dst: &mut BytesMut) -> Result<()> {
    let count = i32::try_from(count).map_err(|_| FrameError::PayloadTooLarge {
        size: count,
        max: i32::MAX as usize,
    })?;
    dst.put_i32_le(count);
    Ok(())
}

fn decode_values(src: &mut Bytes, what: &str) -> Result<Vec<TypedValue>> {
    let count = get_i32(src, "value count")?;
    let count = usize::try_from(count)
        .map_err(|_| FrameError::malformed(format!("negative {what} count {count}")))?;

    // Every value is at least one tag byte.
    if count > src.len() {
        return Err(FrameError::malformed(format!(
            "{what} count {count} exceeds remaining {} bytes",
            src.len()
        )));
    }

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(decode_value(src)?);
    }
    Ok(values)
}

fn ensure_consumed(src: &Bytes) -> Result<()> {
    if !src.is_empty() {
        return Err(FrameError::malformed(format!(
            "{} trailing bytes after body",
            src.len()
        )));
    }
    Ok(())
}
