use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::RpcStream;

/// Blocking TCP transport.
///
/// Provides bind/accept for the server side and one-shot connect for clients.
/// The listening socket is closed when the value is dropped.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `host:port`. Port 0 picks an ephemeral port; the
    /// chosen port is reported by [`TcpTransport::local_addr`].
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let addr = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };

        let listener = TcpListener::bind(&addr).map_err(|e| TransportError::Bind {
            addr: addr.clone(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.clone(),
            source: e,
        })?;

        info!(%local_addr, "listening on tcp socket");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<RpcStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(%peer, "accepted connection");
        Ok(RpcStream::from_tcp(stream))
    }

    /// Open a fresh connection to the endpoint's host and port (blocking).
    pub fn connect(endpoint: &Endpoint) -> Result<RpcStream> {
        Self::connect_addr(&endpoint.socket_addr_string())
    }

    /// Open a fresh connection to a `host:port` address (blocking).
    pub fn connect_addr(addr: &str) -> Result<RpcStream> {
        let stream = TcpStream::connect(addr).map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;
        stream.set_nodelay(true)?;
        debug!(addr, "connected to tcp endpoint");
        Ok(RpcStream::from_tcp(stream))
    }

    /// The address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_accept_connect() {
        let listener = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = listener.local_addr().port();
        assert_ne!(port, 0, "ephemeral port should be resolved after bind");

        let handle = std::thread::spawn(move || {
            let endpoint = Endpoint::new("simple", "127.0.0.1", port);
            let mut client = TcpTransport::connect(&endpoint).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused_reports_address() {
        // Bind then drop to obtain a port with nothing listening on it.
        let port = TcpTransport::bind("127.0.0.1", 0).unwrap().local_addr().port();
        let endpoint = Endpoint::new("simple", "127.0.0.1", port);

        let result = TcpTransport::connect(&endpoint);
        match result {
            Err(TransportError::Connect { addr, .. }) => {
                assert_eq!(addr, format!("127.0.0.1:{port}"));
            }
            other => panic!("expected connect error, got {other:?}"),
        }
    }

    #[test]
    fn test_bind_conflict_is_bind_error() {
        let first = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let port = first.local_addr().port();
        let result = TcpTransport::bind("127.0.0.1", port);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_shutdown_write_signals_eof() {
        let listener = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().to_string();

        let handle = std::thread::spawn(move || {
            let client = TcpTransport::connect_addr(&addr).unwrap();
            client.shutdown_write().unwrap();
            client
        });

        let mut server = listener.accept().unwrap();
        let mut buf = Vec::new();
        server.read_to_end(&mut buf).unwrap();
        assert!(buf.is_empty());

        let _client = handle.join().unwrap();
    }
}
