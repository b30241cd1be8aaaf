//! Message kind byte carried in every frame header.

use crate::error::FrameError;

/// Kind of a framed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Client-to-server invocation; carries a target object URI.
    Request = 0,
    /// Server-to-client result, success or fault.
    Response = 1,
}

impl MessageKind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Response => "RESPONSE",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Request),
            1 => Ok(Self::Response),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_bytes_are_stable() {
        assert_eq!(MessageKind::Request.as_byte(), 0);
        assert_eq!(MessageKind::Response.as_byte(), 1);
        assert_eq!(MessageKind::try_from(1).unwrap(), MessageKind::Response);
        assert!(matches!(
            MessageKind::try_from(7),
            Err(FrameError::UnknownKind(7))
        ));
    }
}
