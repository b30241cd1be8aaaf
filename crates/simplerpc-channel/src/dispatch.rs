//! Collaborator seams consumed by the server pipeline.
//!
//! The channel never invokes application code itself: a [`Registry`] maps
//! object URIs to opaque [`TargetHandle`]s and a [`Dispatcher`] performs the
//! call. Plain closures implement both traits.

use std::fmt;
use std::sync::Arc;

use simplerpc_frame::{InvocationResult, TypedValue};

/// Error type a dispatcher may return. Only its `Display` text reaches the
/// caller.
pub type DispatchError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque token for a resolved remote object.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TargetHandle {
    object_uri: Arc<str>,
}

impl TargetHandle {
    pub fn new(object_uri: &str) -> Self {
        Self {
            object_uri: Arc::from(object_uri),
        }
    }

    /// URI the handle was resolved from.
    pub fn object_uri(&self) -> &str {
        &self.object_uri
    }
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetHandle").field(&self.object_uri).finish()
    }
}

/// Resolves object URIs to targets.
pub trait Registry: Send + Sync {
    /// `None` means nothing is published at `object_uri`.
    fn resolve(&self, object_uri: &str) -> Option<TargetHandle>;
}

/// Invokes a method on a resolved target.
pub trait Dispatcher: Send + Sync {
    fn invoke(
        &self,
        target: &TargetHandle,
        method: &str,
        args: Vec<TypedValue>,
    ) -> Result<InvocationResult, DispatchError>;
}

impl<F> Registry for F
where
    F: Fn(&str) -> Option<TargetHandle> + Send + Sync,
{
    fn resolve(&self, object_uri: &str) -> Option<TargetHandle> {
        self(object_uri)
    }
}

impl<F> Dispatcher for F
where
    F: Fn(&TargetHandle, &str, Vec<TypedValue>) -> Result<InvocationResult, DispatchError>
        + Send
        + Sync,
{
    fn invoke(
        &self,
        target: &TargetHandle,
        method: &str,
        args: Vec<TypedValue>,
    ) -> Result<InvocationResult, DispatchError> {
        self(target, method, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_collaborators() {
        let registry = |uri: &str| (uri == "Calc").then(|| TargetHandle::new(uri));
        let dispatcher = |target: &TargetHandle,
                          method: &str,
                          args: Vec<TypedValue>|
         -> Result<InvocationResult, DispatchError> {
            Ok(InvocationResult::returning(format!(
                "{}.{}/{}",
                target.object_uri(),
                method,
                args.len()
            )))
        };

        let handle = Registry::resolve(&registry, "Calc").unwrap();
        assert_eq!(handle.object_uri(), "Calc");
        assert!(Registry::resolve(&registry, "Other").is_none());

        let result = Dispatcher::invoke(&dispatcher, &handle, "Add", vec![1.into()]).unwrap();
        assert_eq!(result, InvocationResult::returning("Calc.Add/1"));
    }

    #[test]
    fn handles_compare_by_uri() {
        assert_eq!(TargetHandle::new("a"), TargetHandle::new("a"));
        assert_ne!(TargetHandle::new("a"), TargetHandle::new("b"));
        assert_eq!(format!("{:?}", TargetHandle::new("a")), "TargetHandle(\"a\")");
    }
}
