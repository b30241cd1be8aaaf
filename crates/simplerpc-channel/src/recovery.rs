//! Panic containment for per-call work on the server.
//!
//! A panicking dispatcher must cost one call, not the accept loop.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{ChannelError, Result};

/// Run `operation`, turning a panic into [`ChannelError::Panic`].
pub fn with_recovery<T>(operation: impl FnOnce() -> Result<T>, operation_name: &str) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(operation)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(operation = operation_name, panic = %message, "panic recovered");
            Err(ChannelError::Panic(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_results() {
        assert_eq!(with_recovery(|| Ok(7), "ok").unwrap(), 7);

        let err = with_recovery::<()>(
            || Err(ChannelError::ProtocolViolation("x".into())),
            "err",
        )
        .unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn converts_str_and_string_panics() {
        let err = with_recovery::<()>(|| panic!("static message"), "str").unwrap_err();
        assert!(matches!(err, ChannelError::Panic(msg) if msg == "static message"));

        let err = with_recovery::<()>(|| panic!("formatted {}", 42), "string").unwrap_err();
        assert!(matches!(err, ChannelError::Panic(msg) if msg == "formatted 42"));
    }

    #[test]
    fn opaque_payload_gets_placeholder() {
        let err = with_recovery::<()>(|| std::panic::panic_any(5u8), "opaque").unwrap_err();
        assert!(matches!(err, ChannelError::Panic(msg) if msg == "unknown panic"));
    }
}
