//! Server side of a channel.
//!
//! [`ServerTransport`] owns one accepted connection: it reads a single request
//! frame, hands the body down the sink chain and writes back exactly one
//! response. [`ServerFormatter`] is the terminal sink; it resolves the target,
//! decodes the call and asks the [`Dispatcher`] to perform it.

use std::io::{self, Read, Write};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use simplerpc_frame::{
    decode_request, encode_result, FrameConfig, FrameError, FrameReader, FrameWriter,
    InvocationResult, MessageKind, HEADER_SIZE,
};
use tracing::{debug, warn};

use crate::chain::{Pipeline, StageProvider};
use crate::dispatch::{Dispatcher, Registry};
use crate::error::{ChannelError, Result};
use crate::recovery::with_recovery;

/// Most bytes of a rejected body read off the socket before closing.
const DISCARD_LIMIT: usize = 1024 * 1024;

/// One stage between the server transport and the dispatcher.
pub trait ServerChannelSink: Send + Sync {
    /// Handle the body of one request frame addressed to `target_uri`.
    fn process(&self, target_uri: &str, payload: Bytes) -> Result<InvocationResult>;
}

/// Terminal server stage: decode, resolve and dispatch.
#[derive(Clone)]
pub struct ServerFormatter {
    registry: Arc<dyn Registry>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl ServerFormatter {
    pub fn new(registry: Arc<dyn Registry>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Resolve `target_uri`, decode the request and invoke it.
    ///
    /// An error returned by the dispatcher is the application's fault and
    /// becomes a [`InvocationResult::Fault`] with the error's text. Resolution
    /// and decoding failures are returned as errors.
    pub fn dispatch(&self, target_uri: &str, payload: Bytes) -> Result<InvocationResult> {
        let target = self
            .registry
            .resolve(target_uri)
            .ok_or_else(|| ChannelError::TargetNotFound(target_uri.to_string()))?;
        let request = decode_request(payload)?;

        debug!(
            target_uri,
            method = %request.method_name,
            argc = request.arguments.len(),
            "dispatching"
        );

        match self
            .dispatcher
            .invoke(&target, &request.method_name, request.arguments)
        {
            Ok(result) => Ok(result),
            Err(err) => {
                debug!(target_uri, method = %request.method_name, error = %err, "method faulted");
                Ok(InvocationResult::fault(err.to_string()))
            }
        }
    }

    /// Provider for use as the terminal stage of a server chain.
    pub fn provider(
        registry: Arc<dyn Registry>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> StageProvider<dyn ServerChannelSink> {
        StageProvider::terminal("formatter", move || {
            Arc::new(Self::new(registry, dispatcher)) as Arc<dyn ServerChannelSink>
        })
    }
}

impl ServerChannelSink for ServerFormatter {
    fn process(&self, target_uri: &str, payload: Bytes) -> Result<InvocationResult> {
        self.dispatch(target_uri, payload)
    }
}

impl std::fmt::Debug for ServerFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerFormatter").finish_non_exhaustive()
    }
}

/// Head of the server chain; one call per connection.
#[derive(Clone)]
pub struct ServerTransport {
    next: Arc<dyn ServerChannelSink>,
    frame: FrameConfig,
}

impl ServerTransport {
    pub fn new(next: Arc<dyn ServerChannelSink>, frame: FrameConfig) -> Self {
        Self { next, frame }
    }

    /// Serve exactly one request on `stream`.
    ///
    /// A frame that cannot be accepted as a request (bad header, oversized
    /// or malformed body, wrong kind) gets a best-effort fault response and
    /// the violation is returned; the caller closes the connection either way.
    /// A peer that hangs up or fails at the socket level gets no reply. Every
    /// other failure, including a panicking stage, is answered with a fault
    /// and `Ok(())` is returned.
    pub fn handle<S: Read + Write>(&self, mut stream: S) -> Result<()> {
        let mut reader = FrameReader::with_config(&mut stream, self.frame.clone());
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(err @ (FrameError::Io(_) | FrameError::ConnectionClosed)) => {
                return Err(err.into())
            }
            Err(err) => {
                let unread = match &err {
                    FrameError::PayloadTooLarge { size, .. } => {
                        size.saturating_sub(reader.buffered_len().saturating_sub(HEADER_SIZE))
                    }
                    _ => 0,
                };
                // Consume the rest of an oversized body so closing does not
                // reset the connection before the peer reads the fault.
                discard(&mut stream, unread);
                return Err(self.reject(&mut stream, err.to_string()));
            }
        };

        let target_uri = match (frame.kind, frame.target_uri) {
            (MessageKind::Request, Some(uri)) => uri,
            (kind, _) => {
                let reason = format!("expected REQUEST frame, got {}", kind.name());
                return Err(self.reject(&mut stream, reason));
            }
        };

        let payload = frame.payload;
        let next = Arc::clone(&self.next);
        let outcome = with_recovery(|| next.process(&target_uri, payload), "server call");

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                if err.is_protocol_violation() {
                    warn!(target_uri = %target_uri, error = %err, "protocol violation");
                } else {
                    warn!(target_uri = %target_uri, error = %err, "call failed in pipeline");
                }
                InvocationResult::fault(err.to_string())
            }
        };

        self.respond(&mut stream, &result)
    }

    fn reject<S: Write>(&self, stream: &mut S, reason: String) -> ChannelError {
        let violation = ChannelError::ProtocolViolation(reason);
        warn!(error = %violation, "rejecting frame");
        let fault = InvocationResult::fault(violation.to_string());
        if let Err(err) = self.respond(stream, &fault) {
            debug!(error = %err, "could not report protocol violation to peer");
        }
        violation
    }

    fn respond<S: Write>(&self, stream: &mut S, result: &InvocationResult) -> Result<()> {
        let mut body = BytesMut::new();
        if let Err(err) = encode_result(result, &mut body) {
            warn!(error = %err, "result not encodable, sending fault instead");
            body.clear();
            encode_result(&InvocationResult::fault(err.to_string()), &mut body)?;
        }

        let mut writer = FrameWriter::with_config(stream, self.frame.clone());
        if let Err(err) = writer.send_response(body.freeze()) {
            // Oversized results degrade to a fault as well.
            if !matches!(err, FrameError::PayloadTooLarge { .. }) {
                return Err(err.into());
            }
            warn!(error = %err, "result exceeds frame limit, sending fault instead");
            let mut body = BytesMut::new();
            encode_result(&InvocationResult::fault(err.to_string()), &mut body)?;
            writer.send_response(body.freeze())?;
        }
        Ok(())
    }
}

/// Read and drop up to `len` bytes, capped at [`DISCARD_LIMIT`].
fn discard<S: Read>(stream: &mut S, len: usize) {
    let limit = len.min(DISCARD_LIMIT) as u64;
    if limit == 0 {
        return;
    }
    if let Err(err) = io::copy(&mut stream.by_ref().take(limit), &mut io::sink()) {
        debug!(error = %err, "failed to discard rejected body");
    }
}

impl std::fmt::Debug for ServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTransport")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// A composed server chain ready to be handed to a listener.
#[derive(Debug, Clone)]
pub struct ServerPipeline {
    transport: ServerTransport,
    sinks: Pipeline<dyn ServerChannelSink>,
}

impl ServerPipeline {
    pub fn builder(
        registry: Arc<dyn Registry>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> ServerPipelineBuilder {
        ServerPipelineBuilder {
            registry,
            dispatcher,
            providers: Vec::new(),
            frame: FrameConfig::default(),
        }
    }

    /// Serve one connection; see [`ServerTransport::handle`].
    pub fn handle<S: Read + Write>(&self, stream: S) -> Result<()> {
        self.transport.handle(stream)
    }

    /// Stage names below the transport, outermost first.
    pub fn stage_names(&self) -> &[String] {
        self.sinks.stage_names()
    }
}

/// Collects sink providers for a [`ServerPipeline`].
pub struct ServerPipelineBuilder {
    registry: Arc<dyn Registry>,
    dispatcher: Arc<dyn Dispatcher>,
    providers: Vec<StageProvider<dyn ServerChannelSink>>,
    frame: FrameConfig,
}

impl ServerPipelineBuilder {
    /// Append a stage below the transport (and below earlier stages).
    pub fn with_stage(mut self, provider: StageProvider<dyn ServerChannelSink>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Compose the chain. A [`ServerFormatter`] over the builder's registry
    /// and dispatcher is appended when no terminal stage was supplied.
    pub fn build(self) -> Result<ServerPipeline> {
        let Self {
            registry,
            dispatcher,
            providers,
            frame,
        } = self;
        let sinks =
            Pipeline::compose(providers, move || ServerFormatter::provider(registry, dispatcher))?;
        let transport = ServerTransport::new(Arc::clone(sinks.head()), frame);
        Ok(ServerPipeline { transport, sinks })
    }
}
