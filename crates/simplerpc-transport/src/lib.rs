//! Endpoint parsing and blocking TCP transport.
//!
//! This is the lowest layer of simplerpc. It knows how to parse
//! `simple://host:port/objectURI` endpoint strings and how to bind, accept and
//! connect plain TCP sockets. Everything else builds on top of the
//! [`RpcStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod stream;
pub mod tcp;

pub use endpoint::{canonicalize, Endpoint, CANONICAL_SCHEME, SIMPLE_SCHEME};
pub use error::{ParseError, Result, TransportError};
pub use stream::RpcStream;
pub use tcp::TcpTransport;
