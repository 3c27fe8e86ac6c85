//! Service-type to handler-factory registration
//!
//! The registry is filled at startup, before any device is created, and is
//! only read afterwards. Each entry knows how to build the handler of one
//! service type from the service's metadata and notifier.

use std::collections::HashMap;
use std::sync::Arc;

use upnp_core::ServiceMetadata;

use crate::dispatcher::{Dispatcher, ServiceHandler};
use crate::error::{Result, ServiceError};
use crate::notifier::Notifier;

/// Builds the handler of one service type
pub type ServiceFactory =
    Box<dyn Fn(Arc<ServiceMetadata>, Notifier) -> Result<Box<dyn ServiceHandler>> + Send + Sync>;

/// Registry of resource types keyed by service-type URN
#[derive(Default)]
pub struct ResourceRegistry {
    factories: HashMap<String, ServiceFactory>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `service_type`
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register_resource_type<F>(&mut self, service_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(Arc<ServiceMetadata>, Notifier) -> Result<Box<dyn ServiceHandler>> + Send + Sync + 'static,
    {
        let service_type = service_type.into();
        if self.factories.insert(service_type.clone(), Box::new(factory)).is_some() {
            tracing::info!(service_type = %service_type, "Replaced resource type registration");
        } else {
            tracing::debug!(service_type = %service_type, "Registered resource type");
        }
        self
    }

    pub fn unregister(&mut self, service_type: &str) -> bool {
        self.factories.remove(service_type).is_some()
    }

    pub fn is_registered(&self, service_type: &str) -> bool {
        self.factories.contains_key(service_type)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build the handler for a described service
    ///
    /// Unregistered types get a bare dispatcher: every action faults with
    /// `401 Invalid Action` and every query is unknown.
    pub fn create(&self, metadata: Arc<ServiceMetadata>, notifier: Notifier) -> Result<Box<dyn ServiceHandler>> {
        match self.factories.get(metadata.service_type()) {
            Some(factory) => {
                let service_type = metadata.service_type().to_string();
                factory(metadata, notifier).map_err(|e| {
                    tracing::warn!(service_type = %service_type, error = %e, "Service factory failed");
                    ServiceError::FactoryFailed {
                        service_type,
                        reason: e.to_string(),
                    }
                })
            }
            None => {
                tracing::warn!(
                    service_type = metadata.service_type(),
                    "No resource type registered, service will answer every action with a fault"
                );
                Ok(Box::new(Dispatcher::new(metadata, notifier, ())))
            }
        }
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.factories.keys().collect();
        types.sort();
        f.debug_struct("ResourceRegistry").field("service_types", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use upnp_core::{
        ActionDescriptor, ActionInvocation, ActionResult, DataType, Fault, NullSink,
        StateVariableDescriptor, Value,
    };

    const SERVICE_TYPE: &str = "urn:test:service:Bell:1";

    fn metadata() -> Arc<ServiceMetadata> {
        Arc::new(
            ServiceMetadata::builder(SERVICE_TYPE)
                .state_variable(StateVariableDescriptor::new("Rung", DataType::Boolean))
                .action(ActionDescriptor::new("Ring"))
                .build()
                .unwrap(),
        )
    }

    fn notifier(metadata: &ServiceMetadata) -> Notifier {
        Notifier::new(metadata, Arc::new(NullSink), &DeviceConfig::default())
    }

    fn bell(message: &'static str) -> impl Fn(Arc<ServiceMetadata>, Notifier) -> Result<Box<dyn ServiceHandler>> {
        move |metadata, notifier| {
            let dispatcher = Dispatcher::new(metadata, notifier, false)
                .on_action("Ring", move |rung: &mut bool, action, _| {
                    *rung = true;
                    action.return_error(Fault::ACTION_FAILED, message);
                })?
                .on_query("Rung", |rung: &bool| Value::Bool(*rung))?;
            Ok(Box::new(dispatcher) as Box<dyn ServiceHandler>)
        }
    }

    #[test]
    fn test_registered_factory_is_used() {
        let mut registry = ResourceRegistry::new();
        registry.register_resource_type(SERVICE_TYPE, bell("first"));
        assert!(registry.is_registered(SERVICE_TYPE));

        let metadata = metadata();
        let mut handler = registry.create(metadata.clone(), notifier(&metadata)).unwrap();
        assert_eq!(handler.query("Rung"), Some(Value::Bool(false)));
        let result = handler.dispatch(ActionInvocation::new("Ring"));
        assert_eq!(result.fault().map(|f| f.message.as_str()), Some("first"));
        assert_eq!(handler.query("Rung"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = ResourceRegistry::new();
        registry
            .register_resource_type(SERVICE_TYPE, bell("first"))
            .register_resource_type(SERVICE_TYPE, bell("second"));
        assert_eq!(registry.len(), 1);

        let metadata = metadata();
        let mut handler = registry.create(metadata.clone(), notifier(&metadata)).unwrap();
        let result = handler.dispatch(ActionInvocation::new("Ring"));
        assert_eq!(result.fault().map(|f| f.message.as_str()), Some("second"));
    }

    #[test]
    fn test_unregistered_type_gets_bare_dispatcher() {
        let registry = ResourceRegistry::new();
        let metadata = metadata();
        let mut handler = registry.create(metadata.clone(), notifier(&metadata)).unwrap();

        assert_eq!(
            handler.dispatch(ActionInvocation::new("Ring")),
            ActionResult::Fault(Fault::invalid_action())
        );
        assert_eq!(handler.query("Rung"), None);
        assert!(handler.evented_snapshot().is_empty());
    }

    #[test]
    fn test_unregister() {
        let mut registry = ResourceRegistry::new();
        registry.register_resource_type(SERVICE_TYPE, bell("first"));
        assert!(registry.unregister(SERVICE_TYPE));
        assert!(!registry.unregister(SERVICE_TYPE));
        assert!(registry.is_empty());
    }
}
