//! Client side of a channel.
//!
//! [`ClientFormatter`] turns invocation requests into bytes and back; below it
//! sits a chain of [`ClientChannelSink`]s ending in a [`TcpClientTransport`]
//! that opens one connection per call.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use simplerpc_frame::{
    decode_result, encode_request, FrameConfig, FrameReader, FrameWriter, InvocationRequest,
    InvocationResult, MessageKind,
};
use simplerpc_transport::{Endpoint, TcpTransport};
use tracing::{debug, warn};

use crate::chain::{Pipeline, StageProvider};
use crate::error::{ChannelError, Result};

/// One byte-level stage between the client formatter and the wire.
pub trait ClientChannelSink: Send + Sync {
    /// Carry one encoded request to `endpoint` and return the encoded
    /// response body.
    fn process(&self, endpoint: &Endpoint, request: Bytes) -> Result<Bytes>;
}

/// Terminal client stage: one fresh TCP connection per call.
#[derive(Debug, Clone, Default)]
pub struct TcpClientTransport {
    frame: FrameConfig,
}

impl TcpClientTransport {
    pub fn new(frame: FrameConfig) -> Self {
        Self { frame }
    }

    /// Connect, write one request frame, read exactly one response frame.
    ///
    /// The connection is owned by this call and closed on every return path.
    pub fn exchange(&self, endpoint: &Endpoint, request: Bytes) -> Result<Bytes> {
        let target = endpoint
            .object_uri()
            .ok_or_else(|| ChannelError::MissingObjectUri(endpoint.to_url()))?;

        let mut stream = TcpTransport::connect(endpoint)?;

        FrameWriter::with_config(&mut stream, self.frame.clone()).send_request(target, request)?;
        let frame = FrameReader::with_config(&mut stream, self.frame.clone()).read_frame()?;

        if frame.kind != MessageKind::Response {
            return Err(ChannelError::ProtocolViolation(format!(
                "expected RESPONSE frame, got {}",
                frame.kind.name()
            )));
        }

        debug!(
            endpoint = %endpoint,
            response_size = frame.payload.len(),
            "exchange complete"
        );
        Ok(frame.payload)
    }

    /// Provider for use as the terminal stage of a client chain.
    pub fn provider(frame: FrameConfig) -> StageProvider<dyn ClientChannelSink> {
        StageProvider::terminal("tcp-transport", move || {
            Arc::new(Self::new(frame)) as Arc<dyn ClientChannelSink>
        })
    }
}

impl ClientChannelSink for TcpClientTransport {
    fn process(&self, endpoint: &Endpoint, request: Bytes) -> Result<Bytes> {
        self.exchange(endpoint, request)
    }
}

/// Head of the client chain: encodes requests and decodes results.
///
/// Holds no per-call state; calls from many threads proceed independently.
#[derive(Clone)]
pub struct ClientFormatter {
    endpoint: Endpoint,
    next: Arc<dyn ClientChannelSink>,
}

impl ClientFormatter {
    pub fn new(endpoint: Endpoint, next: Arc<dyn ClientChannelSink>) -> Self {
        Self { endpoint, next }
    }

    /// Perform one remote call.
    ///
    /// Never fails: transport, protocol and codec errors come back as
    /// [`InvocationResult::Fault`] carrying the error text.
    pub fn invoke(&self, request: &InvocationRequest) -> InvocationResult {
        match self.try_invoke(request) {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    endpoint = %self.endpoint,
                    method = %request.method_name,
                    error = %err,
                    "call failed locally"
                );
                InvocationResult::fault(err.to_string())
            }
        }
    }

    /// Perform one remote call with host-side argument values.
    ///
    /// Arguments outside the wire's closed value set produce a fault before
    /// any connection is opened.
    pub fn call(&self, method: &str, args: &[serde_json::Value]) -> InvocationResult {
        match InvocationRequest::from_json(method, args) {
            Ok(request) => self.invoke(&request),
            Err(err) => {
                warn!(method, error = %err, "rejected arguments before sending");
                InvocationResult::fault(ChannelError::from(err).to_string())
            }
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn try_invoke(&self, request: &InvocationRequest) -> Result<InvocationResult> {
        let mut buf = BytesMut::new();
        encode_request(request, &mut buf)?;
        let response = self.next.process(&self.endpoint, buf.freeze())?;
        Ok(decode_result(response)?)
    }
}

impl std::fmt::Debug for ClientFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFormatter")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// A composed client channel for one remote object.
#[derive(Debug, Clone)]
pub struct ClientPipeline {
    formatter: ClientFormatter,
    sinks: Pipeline<dyn ClientChannelSink>,
}

impl ClientPipeline {
    /// Start building a pipeline for `url` (`simple://host:port/objectURI`).
    pub fn builder(url: &str) -> Result<ClientPipelineBuilder> {
        let endpoint = Endpoint::parse(url)?;
        if endpoint.object_uri().is_none() {
            return Err(ChannelError::MissingObjectUri(url.to_string()));
        }
        Ok(ClientPipelineBuilder {
            endpoint,
            providers: Vec::new(),
            frame: FrameConfig::default(),
        })
    }

    /// See [`ClientFormatter::invoke`].
    pub fn invoke(&self, request: &InvocationRequest) -> InvocationResult {
        self.formatter.invoke(request)
    }

    /// See [`ClientFormatter::call`].
    pub fn call(&self, method: &str, args: &[serde_json::Value]) -> InvocationResult {
        self.formatter.call(method, args)
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.formatter.endpoint()
    }

    /// Stage names below the formatter, outermost first.
    pub fn stage_names(&self) -> &[String] {
        self.sinks.stage_names()
    }
}

/// Collects sink providers for a [`ClientPipeline`].
#[derive(Debug)]
pub struct ClientPipelineBuilder {
    endpoint: Endpoint,
    providers: Vec<StageProvider<dyn ClientChannelSink>>,
    frame: FrameConfig,
}

impl ClientPipelineBuilder {
    /// Append a stage below the formatter (and below earlier stages).
    pub fn with_stage(mut self, provider: StageProvider<dyn ClientChannelSink>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Frame limits for the implicit TCP transport.
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Compose the chain. A TCP transport is appended when the stage list
    /// does not already end in a terminal stage.
    pub fn build(self) -> Result<ClientPipeline> {
        let frame = self.frame;
        let sinks = Pipeline::compose(self.providers, move || TcpClientTransport::provider(frame))?;
        let formatter = ClientFormatter::new(self.endpoint, Arc::clone(sinks.head()));
        Ok(ClientPipeline { formatter, sinks })
    }
}

/// Build the default client pipeline (formatter over TCP transport) for `url`.
pub fn create_client_pipeline(url: &str) -> Result<ClientPipeline> {
    ClientPipeline::builder(url)?.build()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use simplerpc_frame::{decode_request, encode_result, TypedValue};

    use super::*;

    /// Terminal stage that answers in-process and records what it saw.
    struct Loopback {
        seen: Mutex<Vec<(String, InvocationRequest)>>,
        reply: InvocationResult,
    }

    impl ClientChannelSink for Loopback {
        fn process(&self, endpoint: &Endpoint, request: Bytes) -> Result<Bytes> {
            let request = decode_request(request)?;
            self.seen
                .lock()
                .unwrap()
                .push((endpoint.object_uri().unwrap_or_default().to_string(), request));
            let mut buf = BytesMut::new();
            encode_result(&self.reply, &mut buf)?;
            Ok(buf.freeze())
        }
    }

    struct Failing;

    impl ClientChannelSink for Failing {
        fn process(&self, _endpoint: &Endpoint, _request: Bytes) -> Result<Bytes> {
            Err(ChannelError::ProtocolViolation("wire fell over".into()))
        }
    }

    struct Garbage;

    impl ClientChannelSink for Garbage {
        fn process(&self, _endpoint: &Endpoint, _request: Bytes) -> Result<Bytes> {
            Ok(Bytes::from_static(&[0xEE]))
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint::parse("simple://localhost:9000/Calc").unwrap()
    }

    #[test]
    fn invoke_encodes_request_and_decodes_result() {
        let sink = Arc::new(Loopback {
            seen: Mutex::new(Vec::new()),
            reply: InvocationResult::returning(5),
        });
        let formatter = ClientFormatter::new(endpoint(), sink.clone());

        let request = InvocationRequest::new("Add", vec![2.into(), 3.into()]);
        let result = formatter.invoke(&request);

        assert_eq!(result.return_value(), Some(&TypedValue::Int32(5)));
        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("Calc".to_string(), request)]);
    }

    #[test]
    fn sink_errors_become_faults() {
        let formatter = ClientFormatter::new(endpoint(), Arc::new(Failing));
        let result = formatter.invoke(&InvocationRequest::new("Add", vec![]));
        assert_eq!(
            result.fault_message(),
            Some("protocol violation: wire fell over")
        );
    }

    #[test]
    fn undecodable_response_becomes_fault() {
        let formatter = ClientFormatter::new(endpoint(), Arc::new(Garbage));
        let result = formatter.invoke(&InvocationRequest::new("Add", vec![]));
        assert!(result.is_fault());
    }

    #[test]
    fn unsupported_argument_never_reaches_the_sink() {
        let sink = Arc::new(Loopback {
            seen: Mutex::new(Vec::new()),
            reply: InvocationResult::returning(0),
        });
        let formatter = ClientFormatter::new(endpoint(), sink.clone());

        let result = formatter.call("Add", &[serde_json::json!(1), serde_json::json!([1])]);

        assert!(result
            .fault_message()
            .is_some_and(|m| m.contains("cannot encode value of kind array")));
        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn builder_requires_object_uri() {
        let err = ClientPipeline::builder("simple://localhost:9000").unwrap_err();
        assert!(matches!(err, ChannelError::MissingObjectUri(_)));

        let err = ClientPipeline::builder("not-a-url").unwrap_err();
        assert!(matches!(err, ChannelError::Endpoint(_)));
    }

    #[test]
    fn builder_appends_tcp_transport() {
        let pipeline = create_client_pipeline("simple://localhost:9000/Calc").unwrap();
        assert_eq!(pipeline.stage_names(), &["tcp-transport"]);
        assert_eq!(pipeline.endpoint().object_uri(), Some("Calc"));
    }

    #[test]
    fn builder_keeps_custom_terminal() {
        let pipeline = ClientPipeline::builder("simple://localhost:9000/Calc")
            .unwrap()
            .with_stage(StageProvider::terminal("loopback", || {
                Arc::new(Loopback {
                    seen: Mutex::new(Vec::new()),
                    reply: InvocationResult::returning(true),
                }) as Arc<dyn ClientChannelSink>
            }))
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_names(), &["loopback"]);
        let result = pipeline.call("Anything", &[]);
        assert_eq!(result, InvocationResult::returning(true));
    }

    #[test]
    fn connection_refused_is_a_fault() {
        // Bind then drop to find a port with nothing listening.
        let port = TcpTransport::bind("127.0.0.1", 0).unwrap().local_addr().port();
        let pipeline =
            create_client_pipeline(&format!("simple://127.0.0.1:{port}/Calc")).unwrap();

        let result = pipeline.call("Add", &[serde_json::json!(1)]);
        assert!(result
            .fault_message()
            .is_some_and(|m| m.starts_with("transport error: failed to connect")));
    }
}
