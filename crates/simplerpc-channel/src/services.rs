use std::collections::HashMap;
use std::sync::Arc;

use simplerpc_frame::{InvocationResult, TypedValue};
use tracing::debug;

use crate::dispatch::{DispatchError, Dispatcher, Registry, TargetHandle};

/// Errors a hosted object commonly reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("method {method} not found on {object}")]
    UnknownMethod { object: String, method: String },

    #[error("{method}: {message}")]
    InvalidArguments { method: String, message: String },

    #[error("object {0} is not registered")]
    NotRegistered(String),
}

/// An object that can be published in a [`ServiceTable`].
pub trait RemoteObject: Send + Sync {
    fn invoke(&self, method: &str, args: &[TypedValue]) -> Result<InvocationResult, DispatchError>;
}

impl<F> RemoteObject for F
where
    F: Fn(&str, &[TypedValue]) -> Result<InvocationResult, DispatchError> + Send + Sync,
{
    fn invoke(&self, method: &str, args: &[TypedValue]) -> Result<InvocationResult, DispatchError> {
        self(method, args)
    }
}

/// In-memory table of published objects, keyed by object URI.
///
/// Serves as both [`Registry`] and [`Dispatcher`] for hosts that do not bring
/// their own. Populate it before sharing; it is read-only afterwards.
#[derive(Default)]
pub struct ServiceTable {
    objects: HashMap<String, Arc<dyn RemoteObject>>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `object` under `object_uri`, replacing any previous entry.
    pub fn register(&mut self, object_uri: impl Into<String>, object: impl RemoteObject + 'static) {
        let object_uri = object_uri.into();
        debug!(object_uri = %object_uri, "registering remote object");
        self.objects.insert(object_uri, Arc::new(object));
    }

    /// Builder-style [`ServiceTable::register`].
    pub fn with_object(
        mut self,
        object_uri: impl Into<String>,
        object: impl RemoteObject + 'static,
    ) -> Self {
        self.register(object_uri, object);
        self
    }

    /// Published object URIs, sorted.
    pub fn object_uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = self.objects.keys().map(String::as_str).collect();
        uris.sort_unstable();
        uris
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Registry for ServiceTable {
    fn resolve(&self, object_uri: &str) -> Option<TargetHandle> {
        self.objects
            .contains_key(object_uri)
            .then(|| TargetHandle::new(object_uri))
    }
}

impl Dispatcher for ServiceTable {
    fn invoke(
        &self,
        target: &TargetHandle,
        method: &str,
        args: Vec<TypedValue>,
    ) -> Result<InvocationResult, DispatchError> {
        let object = self
            .objects
            .get(target.object_uri())
            .ok_or_else(|| ServiceError::NotRegistered(target.object_uri().to_string()))?;
        object.invoke(method, &args)
    }
}

impl std::fmt::Debug for ServiceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTable")
            .field("objects", &self.object_uris())
            .finish()
    }
}
