//! Client and server sink pipelines for simplerpc.
//!
//! A call travels caller → [`ClientFormatter`] → client sinks →
//! [`TcpClientTransport`] → wire → [`Listener`] → [`ServerTransport`] →
//! server sinks → [`ServerFormatter`] → [`Dispatcher`]. Both chains are
//! composed once from an ordered list of [`StageProvider`]s and never
//! mutated afterwards.

pub mod chain;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod recovery;
pub mod server;
pub mod services;
pub mod trace;

pub use chain::{ChainError, Pipeline, StageProvider};
pub use client::{
    create_client_pipeline, ClientChannelSink, ClientFormatter, ClientPipeline,
    ClientPipelineBuilder, TcpClientTransport,
};
pub use dispatch::{DispatchError, Dispatcher, Registry, TargetHandle};
pub use error::{ChannelError, Result};
pub use listener::{Listener, ListenerConfig, ListenerState};
pub use server::{
    ServerChannelSink, ServerFormatter, ServerPipeline, ServerPipelineBuilder, ServerTransport,
};
pub use services::{RemoteObject, ServiceError, ServiceTable};
pub use trace::{client_trace_stage, server_trace_stage};

pub use simplerpc_frame::{InvocationRequest, InvocationResult, RemoteFault, TypedValue};
pub use simplerpc_transport::{canonicalize, Endpoint, ParseError};
