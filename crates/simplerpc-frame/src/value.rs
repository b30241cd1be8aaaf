use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

pub const TAG_BOOL: u8 = 0x01;
pub const TAG_INT32: u8 = 0x02;
pub const TAG_STRING: u8 = 0x03;
pub const TAG_NULL: u8 = 0x04;
pub const TAG_EXCEPTION: u8 = 0x05;

/// A value that can cross the wire.
///
/// The set of kinds is closed. Host values of any other shape are rejected
/// with [`FrameError::Unsupported`] when lowered into a `TypedValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Bool(bool),
    Int32(i32),
    String(String),
    Null,
    /// Textual message of a failed invocation. Type and stack are not carried.
    ExceptionMessage(String),
}

impl TypedValue {
    /// Tag byte written ahead of the value body.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Bool(_) => TAG_BOOL,
            Self::Int32(_) => TAG_INT32,
            Self::String(_) => TAG_STRING,
            Self::Null => TAG_NULL,
            Self::ExceptionMessage(_) => TAG_EXCEPTION,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Host-side view of the value. Exception messages become
    /// `{"exception": "<message>"}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(v) => serde_json::Value::Bool(*v),
            Self::Int32(v) => serde_json::Value::from(*v),
            Self::String(v) => serde_json::Value::String(v.clone()),
            Self::Null => serde_json::Value::Null,
            Self::ExceptionMessage(msg) => serde_json::json!({ "exception": msg }),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Null => f.write_str("null"),
            Self::ExceptionMessage(msg) => write!(f, "exception({msg:?})"),
        }
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<&serde_json::Value> for TypedValue {
    type Error = FrameError;

    /// Lower a host value into the closed wire set.
    fn try_from(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(v) => Ok(Self::Bool(*v)),
            Value::String(v) => Ok(Self::String(v.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(v) => i32::try_from(v).map(Self::Int32).map_err(|_| {
                    FrameError::Unsupported {
                        kind: format!("integer {v} (outside int32 range)"),
                    }
                }),
                None if n.is_u64() => Err(FrameError::Unsupported {
                    kind: format!("integer {n} (outside int32 range)"),
                }),
                None => Err(FrameError::Unsupported {
                    kind: "float".to_string(),
                }),
            },
            Value::Array(_) => Err(FrameError::Unsupported {
                kind: "array".to_string(),
            }),
            Value::Object(_) => Err(FrameError::Unsupported {
                kind: "object".to_string(),
            }),
        }
    }
}

/// Encode a typed value: tag byte followed by the kind-specific body.
pub fn encode_value(value: &TypedValue, dst: &mut BytesMut) -> Result<()> {
    dst.put_u8(value.tag());
    match value {
        TypedValue::Bool(v) => dst.put_u8(u8::from(*v)),
        TypedValue::Int32(v) => dst.put_i32_le(*v),
        TypedValue::String(v) | TypedValue::ExceptionMessage(v) => put_string(v, dst)?,
        TypedValue::Null => {}
    }
    Ok(())
}

/// Decode one typed value from the front of `src`, consuming its bytes.
pub fn decode_value(src: &mut Bytes) -> Result<TypedValue> {
    ensure_remaining(src, 1, "value tag")?;
    match src.get_u8() {
        TAG_BOOL => {
            ensure_remaining(src, 1, "bool body")?;
            match src.get_u8() {
                0 => Ok(TypedValue::Bool(false)),
                1 => Ok(TypedValue::Bool(true)),
                other => Err(FrameError::malformed(format!("invalid bool byte {other}"))),
            }
        }
        TAG_INT32 => Ok(TypedValue::Int32(get_i32(src, "int32 body")?)),
        TAG_STRING => Ok(TypedValue::String(get_string(src)?)),
        TAG_NULL => Ok(TypedValue::Null),
        TAG_EXCEPTION => Ok(TypedValue::ExceptionMessage(get_string(src)?)),
        other => Err(FrameError::UnknownTag(other)),
    }
}

/// Write a `[len: u32 LE][utf-8]` string.
pub(crate) fn put_string(value: &str, dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(value.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: value.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(4 + value.len());
    dst.put_u32_le(len);
    dst.put_slice(value.as_bytes());
    Ok(())
}

/// Read a `[len: u32 LE][utf-8]` string.
pub(crate) fn get_string(src: &mut Bytes) -> Result<String> {
    ensure_remaining(src, 4, "string length")?;
    let len = src.get_u32_le() as usize;
    ensure_remaining(src, len, "string body")?;
    let raw = src.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|err| FrameError::malformed(format!("string is not valid UTF-8: {err}")))
}

pub(crate) fn get_i32(src: &mut Bytes, what: &str) -> Result<i32> {
    ensure_remaining(src, 4, what)?;
    Ok(src.get_i32_le())
}

fn ensure_remaining(src: &Bytes, needed: usize, what: &str) -> Result<()> {
    if src.remaining() < needed {
        return Err(FrameError::malformed(format!(
            "truncated {what}: need {needed} bytes, have {}",
            src.remaining()
        )));
    }
    Ok(())
}
