//! Minimal remote procedure calls over one-shot TCP connections.
//!
//! A client names a remote object with `simple://host:port/objectURI`, sends a
//! method name and typed arguments, and receives a typed return value plus
//! out-arguments, or a fault carrying the remote error's message. Every call
//! opens its own connection.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoint parsing and blocking TCP connections
//! - [`frame`]: typed values, call bodies and the framed wire format
//! - [`channel`]: client/server pipelines, the pipeline composer and the listener
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use simplerpc::channel::{
//!     create_client_pipeline, DispatchError, InvocationResult, Listener, ListenerConfig,
//!     ServerPipeline, ServiceTable, TypedValue,
//! };
//!
//! let table = Arc::new(ServiceTable::new().with_object(
//!     "Calc",
//!     |_: &str, args: &[TypedValue]| -> Result<InvocationResult, DispatchError> {
//!         let sum: i32 = args.iter().filter_map(TypedValue::as_i32).sum();
//!         Ok(InvocationResult::returning(sum))
//!     },
//! ));
//! let pipeline = ServerPipeline::builder(table.clone(), table).build()?;
//! let listener = Listener::new(ListenerConfig::new("127.0.0.1", 0), pipeline);
//! listener.start()?;
//!
//! let url = listener.url_for("Calc").unwrap_or_default();
//! let client = create_client_pipeline(&url)?;
//! let result = client.call("Add", &[2.into(), 3.into()]);
//! assert_eq!(result, InvocationResult::returning(5));
//! # Ok::<(), simplerpc::channel::ChannelError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use simplerpc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use simplerpc_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use simplerpc_channel::*;
}
