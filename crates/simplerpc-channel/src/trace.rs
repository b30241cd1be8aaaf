//! Pass-through stages that log each call as it crosses them.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use simplerpc_frame::InvocationResult;
use simplerpc_transport::Endpoint;
use tracing::{debug, warn};

use crate::chain::StageProvider;
use crate::client::ClientChannelSink;
use crate::error::Result;
use crate::server::ServerChannelSink;

/// Client stage that logs request and response sizes.
pub struct ClientTraceSink {
    next: Arc<dyn ClientChannelSink>,
}

impl ClientTraceSink {
    pub fn new(next: Arc<dyn ClientChannelSink>) -> Self {
        Self { next }
    }
}

impl ClientChannelSink for ClientTraceSink {
    fn process(&self, endpoint: &Endpoint, request: Bytes) -> Result<Bytes> {
        let started = Instant::now();
        let request_size = request.len();
        match self.next.process(endpoint, request) {
            Ok(response) => {
                debug!(
                    endpoint = %endpoint,
                    request_size,
                    response_size = response.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "client call"
                );
                Ok(response)
            }
            Err(err) => {
                warn!(
                    endpoint = %endpoint,
                    request_size,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "client call failed"
                );
                Err(err)
            }
        }
    }
}

/// Server stage that logs the target and outcome of each request.
pub struct ServerTraceSink {
    next: Arc<dyn ServerChannelSink>,
}

impl ServerTraceSink {
    pub fn new(next: Arc<dyn ServerChannelSink>) -> Self {
        Self { next }
    }
}

impl ServerChannelSink for ServerTraceSink {
    fn process(&self, target_uri: &str, payload: Bytes) -> Result<InvocationResult> {
        let started = Instant::now();
        let request_size = payload.len();
        let outcome = self.next.process(target_uri, payload);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => debug!(
                target_uri,
                request_size,
                fault = result.is_fault(),
                elapsed_ms,
                "server call"
            ),
            Err(err) => warn!(
                target_uri,
                request_size,
                elapsed_ms,
                error = %err,
                "server call failed"
            ),
        }
        outcome
    }
}

/// Provider for a [`ClientTraceSink`].
pub fn client_trace_stage() -> StageProvider<dyn ClientChannelSink> {
    StageProvider::wrap("trace", |next| {
        Arc::new(ClientTraceSink::new(next)) as Arc<dyn ClientChannelSink>
    })
}

/// Provider for a [`ServerTraceSink`].
pub fn server_trace_stage() -> StageProvider<dyn ServerChannelSink> {
    StageProvider::wrap("trace", |next| {
        Arc::new(ServerTraceSink::new(next)) as Arc<dyn ServerChannelSink>
    })
}
