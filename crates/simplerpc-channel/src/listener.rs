//! TCP listener that feeds accepted connections to a server pipeline.
//!
//! One accept thread pushes connections into a bounded queue drained by a
//! small worker pool. With the default configuration (one worker, queue depth
//! one) calls are served strictly one at a time.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use simplerpc_frame::FrameError;
use simplerpc_transport::{canonicalize, Endpoint, RpcStream, TcpTransport, TransportError};
use tracing::{debug, info, warn};

use crate::error::{ChannelError, Result};
use crate::server::ServerPipeline;

const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Where and how a [`Listener`] serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Host or address to bind.
    pub host: String,
    /// Port to bind; 0 picks an ephemeral port.
    pub port: u16,
    /// Worker threads running exchanges. Values below 1 are treated as 1.
    pub workers: usize,
    /// Accepted connections that may wait for a worker.
    pub queue_depth: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            workers: 1,
            queue_depth: 1,
        }
    }
}

impl ListenerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

/// Externally visible listener state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Listening,
}

enum Phase {
    Idle,
    Running(Running),
    Retired,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accept: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

/// Accepts connections and serves one call per connection.
pub struct Listener {
    config: ListenerConfig,
    pipeline: ServerPipeline,
    phase: Mutex<Phase>,
}

impl Listener {
    pub fn new(config: ListenerConfig, pipeline: ServerPipeline) -> Self {
        Self {
            config,
            pipeline,
            phase: Mutex::new(Phase::Idle),
        }
    }

    /// Bind and begin accepting.
    ///
    /// No-op while listening. A listener that has been stopped cannot be
    /// started again and reports [`ChannelError::ListenerRetired`].
    pub fn start(&self) -> Result<()> {
        let mut phase = self.lock_phase();
        match *phase {
            Phase::Running(_) => return Ok(()),
            Phase::Retired => return Err(ChannelError::ListenerRetired),
            Phase::Idle => {}
        }

        let transport = TcpTransport::bind(&self.config.host, self.config.port)?;
        let local_addr = transport.local_addr();
        let shutdown = Arc::new(AtomicBool::new(false));

        let (tx, rx) = mpsc::sync_channel::<RpcStream>(self.config.queue_depth);
        let rx = Arc::new(Mutex::new(rx));

        let worker_count = self.config.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let rx = Arc::clone(&rx);
            let pipeline = self.pipeline.clone();
            let handle = thread::Builder::new()
                .name(format!("simplerpc-worker-{id}"))
                .spawn(move || worker_loop(id, rx, pipeline))
                .map_err(TransportError::from)?;
            workers.push(handle);
        }

        let accept_shutdown = Arc::clone(&shutdown);
        let accept = thread::Builder::new()
            .name("simplerpc-accept".to_string())
            .spawn(move || accept_loop(transport, tx, accept_shutdown))
            .map_err(TransportError::from)?;

        info!(
            %local_addr,
            workers = worker_count,
            queue_depth = self.config.queue_depth,
            "listener started"
        );

        *phase = Phase::Running(Running {
            local_addr,
            shutdown,
            accept,
            workers,
        });
        Ok(())
    }

    /// Stop accepting, close the socket and wait for in-flight calls.
    ///
    /// No-op unless listening.
    pub fn stop(&self) {
        let mut phase = self.lock_phase();
        let running = match std::mem::replace(&mut *phase, Phase::Retired) {
            Phase::Running(running) => running,
            other => {
                *phase = other;
                return;
            }
        };

        running.shutdown.store(true, Ordering::SeqCst);
        let wake_addr = wake_address(running.local_addr);
        if let Err(err) = TcpTransport::connect_addr(&wake_addr.to_string()) {
            warn!(%wake_addr, error = %err, "could not wake accept loop");
        }

        if running.accept.join().is_err() {
            warn!("accept thread panicked");
        }
        // The accept thread owned the queue sender; workers drain and exit.
        for worker in running.workers {
            if worker.join().is_err() {
                warn!("worker thread panicked");
            }
        }

        info!(local_addr = %running.local_addr, "listener stopped");
    }

    pub fn state(&self) -> ListenerState {
        match *self.lock_phase() {
            Phase::Running(_) => ListenerState::Listening,
            Phase::Idle | Phase::Retired => ListenerState::Stopped,
        }
    }

    /// Bound socket address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.lock_phase() {
            Phase::Running(running) => Some(running.local_addr),
            Phase::Idle | Phase::Retired => None,
        }
    }

    /// Bound port while listening.
    pub fn port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    /// Canonical `tcp://host:port` form of the bound address.
    pub fn channel_uri(&self) -> Option<String> {
        self.local_addr()
            .map(|addr| canonicalize(&published_host(addr.ip()), addr.port()))
    }

    /// `simple://host:port/object_uri` that clients can use to reach
    /// `object_uri` on this listener.
    pub fn url_for(&self, object_uri: &str) -> Option<String> {
        self.local_addr().map(|addr| {
            Endpoint::new("simple", published_host(addr.ip()), addr.port())
                .with_object_uri(object_uri)
                .to_url()
        })
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

fn accept_loop(transport: TcpTransport, queue: SyncSender<RpcStream>, shutdown: Arc<AtomicBool>) {
    let mut backoff = ACCEPT_BACKOFF_START;
    loop {
        match transport.accept() {
            Ok(stream) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                backoff = ACCEPT_BACKOFF_START;
                if queue.send(stream).is_err() {
                    warn!("all workers gone, closing listener");
                    break;
                }
            }
            Err(err) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %err, backoff_ms = backoff.as_millis() as u64, "accept failed");
                thread::sleep(backoff);
                backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
            }
        }
    }
    debug!(local_addr = %transport.local_addr(), "accept loop exited");
}

fn worker_loop(id: usize, queue: Arc<Mutex<Receiver<RpcStream>>>, pipeline: ServerPipeline) {
    loop {
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        let Ok(stream) = next else {
            break;
        };

        let peer = stream.peer_addr().ok();
        match pipeline.handle(stream) {
            Ok(()) => debug!(worker = id, ?peer, "exchange complete"),
            Err(ChannelError::Frame(FrameError::ConnectionClosed)) => {
                debug!(worker = id, ?peer, "peer closed before sending a request")
            }
            Err(err) if err.is_protocol_violation() => {
                debug!(worker = id, ?peer, error = %err, "dropped after protocol violation")
            }
            Err(err) => warn!(worker = id, ?peer, error = %err, "exchange failed"),
        }
    }
    debug!(worker = id, "worker exited");
}

/// Address the listener itself can connect to in order to wake `accept`.
fn wake_address(local: SocketAddr) -> SocketAddr {
    match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local.port())
        }
        _ => local,
    }
}

/// Host name advertised to clients for a bound address.
fn published_host(ip: IpAddr) -> String {
    if ip.is_unspecified() {
        "localhost".to_string()
    } else {
        ip.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceTable;

    fn listener(host: &str) -> Listener {
        let table = Arc::new(ServiceTable::new());
        let pipeline = ServerPipeline::builder(table.clone(), table).build().unwrap();
        Listener::new(ListenerConfig::new(host, 0), pipeline)
    }

    #[test]
    fn default_config_serializes_calls() {
        let config = ListenerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_depth, 1);
    }

    #[test]
    fn start_binds_ephemeral_port() {
        let listener = listener("127.0.0.1");
        assert_eq!(listener.state(), ListenerState::Stopped);
        assert_eq!(listener.port(), None);

        listener.start().unwrap();
        let port = listener.port().unwrap();
        assert_ne!(port, 0);
        assert_eq!(listener.state(), ListenerState::Listening);
        assert_eq!(listener.channel_uri().unwrap(), format!("tcp://127.0.0.1:{port}"));
        assert_eq!(
            listener.url_for("Calc").unwrap(),
            format!("simple://127.0.0.1:{port}/Calc")
        );

        listener.stop();
        assert_eq!(listener.state(), ListenerState::Stopped);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let listener = listener("127.0.0.1");
        listener.stop();
        listener.start().unwrap();
        let port = listener.port();
        listener.start().unwrap();
        assert_eq!(listener.port(), port, "second start must not rebind");

        listener.stop();
        listener.stop();
        assert_eq!(listener.state(), ListenerState::Stopped);
    }

    #[test]
    fn stopped_listener_cannot_restart() {
        let listener = listener("127.0.0.1");
        listener.start().unwrap();
        listener.stop();
        assert!(matches!(listener.start(), Err(ChannelError::ListenerRetired)));
    }

    #[test]
    fn stop_releases_the_port() {
        let listener = listener("127.0.0.1");
        listener.start().unwrap();
        let port = listener.port().unwrap();
        listener.stop();

        let err = TcpTransport::connect_addr(&format!("127.0.0.1:{port}")).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    fn unspecified_bind_publishes_localhost() {
        let listener = listener("0.0.0.0");
        listener.start().unwrap();
        let port = listener.port().unwrap();
        assert_eq!(listener.channel_uri().unwrap(), format!("tcp://localhost:{port}"));
        drop(listener);
    }

    #[test]
    fn bind_conflict_is_reported() {
        let first = listener("127.0.0.1");
        first.start().unwrap();
        let port = first.port().unwrap();

        let table = Arc::new(ServiceTable::new());
        let pipeline = ServerPipeline::builder(table.clone(), table).build().unwrap();
        let second = Listener::new(ListenerConfig::new("127.0.0.1", port), pipeline);
        let err = second.start().unwrap_err();
        assert!(matches!(err, ChannelError::Transport(TransportError::Bind { .. })));
        assert_eq!(second.state(), ListenerState::Stopped);
    }
}
