//! Building and consuming one action invocation

use std::iter::FusedIterator;
use std::sync::Arc;

use upnp_core::{ActionDescriptor, ActionInvocation, ServiceMetadata, Value};

use crate::error::{ProxyError, Result};
use crate::proxy::ServiceProxy;

/// Builder for one invocation of an introspected action
///
/// Obtained from [`ServiceProxy::action`]. The action is known to exist in
/// the metadata snapshot the invoker holds.
#[derive(Debug)]
pub struct ActionInvoker {
    proxy: ServiceProxy,
    metadata: Arc<ServiceMetadata>,
    index: usize,
    invocation: ActionInvocation,
}

impl ActionInvoker {
    pub(crate) fn new(proxy: ServiceProxy, metadata: Arc<ServiceMetadata>, name: &str) -> Result<Self> {
        let index = metadata
            .actions()
            .iter()
            .position(|action| action.name == name)
            .ok_or_else(|| ProxyError::UnknownAction(name.to_string()))?;

        Ok(Self {
            proxy,
            metadata,
            index,
            invocation: ActionInvocation::new(name),
        })
    }

    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.metadata.actions()[self.index]
    }

    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Names of the IN arguments still to be supplied
    pub fn missing_arguments(&self) -> Vec<&str> {
        self.descriptor()
            .in_arguments()
            .filter(|arg| self.invocation.get(&arg.name).is_none())
            .map(|arg| arg.name.as_str())
            .collect()
    }

    /// Allowed values of the enumeration backing `argument`
    ///
    /// Empty when the related state variable is not an enumeration.
    pub fn allowed_values(&self, argument: &str) -> Result<&[String]> {
        Ok(self.metadata.allowed_values(self.name(), argument)?)
    }

    /// Add an IN argument
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.invocation = self.invocation.argument(name, value);
        self
    }

    /// Validate and submit, yielding the OUT arguments
    pub async fn invoke(self) -> Result<OutputIter> {
        self.proxy.invoke(self.invocation).await
    }
}

/// OUT arguments of a successful invocation, in transport order
///
/// Single pass: once exhausted it keeps returning `None`.
#[derive(Debug)]
pub struct OutputIter {
    inner: std::vec::IntoIter<(String, Value)>,
}

impl OutputIter {
    pub(crate) fn new(outputs: Vec<(String, Value)>) -> Self {
        Self {
            inner: outputs.into_iter(),
        }
    }

    /// Consume the rest of the outputs, returning the value named `name`
    pub fn find_value(&mut self, name: &str) -> Option<Value> {
        self.find(|(out, _)| out == name).map(|(_, value)| value)
    }
}

impl Iterator for OutputIter {
    type Item = (String, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for OutputIter {}

impl FusedIterator for OutputIter {}
