//! Hosted root device
//!
//! A [`RootDevice`] is built from a [`DeviceDescription`] whose service
//! metadata the external runtime has already parsed. Each described service
//! gets a handler from the [`ResourceRegistry`] and a [`Notifier`] wired to
//! the device's event sink. The service table is fixed at construction and
//! only read afterwards; each handler sits behind its own lock so calls into
//! different services do not contend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use upnp_core::{ActionInvocation, ActionResult, EventSink, ServiceMetadata, Value};
use uuid::Uuid;

use crate::config::DeviceConfig;
use crate::dispatcher::ServiceHandler;
use crate::error::{Result, ServiceError};
use crate::notifier::Notifier;
use crate::registry::ResourceRegistry;

/// Device description handed over by the runtime
#[derive(Debug, Clone)]
pub struct DeviceDescription {
    /// Description document the runtime serves for this device
    pub description_path: PathBuf,
    /// Unique device name; generated when absent
    pub udn: Option<String>,
    pub device_type: String,
    pub friendly_name: String,
    pub services: Vec<ServiceMetadata>,
}

impl DeviceDescription {
    pub fn new(description_path: impl Into<PathBuf>, device_type: impl Into<String>) -> Self {
        Self {
            description_path: description_path.into(),
            udn: None,
            device_type: device_type.into(),
            friendly_name: String::new(),
            services: Vec::new(),
        }
    }

    pub fn with_udn(mut self, udn: impl Into<String>) -> Self {
        self.udn = Some(udn.into());
        self
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = name.into();
        self
    }

    pub fn with_service(mut self, metadata: ServiceMetadata) -> Self {
        self.services.push(metadata);
        self
    }
}

struct ServiceSlot {
    metadata: Arc<ServiceMetadata>,
    handler: Mutex<Box<dyn ServiceHandler>>,
}

/// A device hosting one handler per described service
pub struct RootDevice {
    udn: String,
    description_path: PathBuf,
    device_type: String,
    friendly_name: String,
    /// Service types in description order
    order: Vec<String>,
    services: HashMap<String, ServiceSlot>,
    available: AtomicBool,
}

impl RootDevice {
    pub fn new(
        description: DeviceDescription,
        registry: &ResourceRegistry,
        sink: Arc<dyn EventSink>,
        config: DeviceConfig,
    ) -> Result<Self> {
        config.validate()?;

        let udn = description
            .udn
            .unwrap_or_else(|| format!("uuid:{}", Uuid::new_v4()));

        let mut order = Vec::with_capacity(description.services.len());
        let mut services = HashMap::with_capacity(description.services.len());
        for metadata in description.services {
            let service_type = metadata.service_type().to_string();
            if services.contains_key(&service_type) {
                return Err(ServiceError::DuplicateService(service_type));
            }

            let metadata = Arc::new(metadata);
            let notifier = Notifier::new(&metadata, sink.clone(), &config);
            let handler = registry.create(metadata.clone(), notifier)?;
            order.push(service_type.clone());
            services.insert(
                service_type,
                ServiceSlot {
                    metadata,
                    handler: Mutex::new(handler),
                },
            );
        }

        tracing::info!(
            udn = %udn,
            device_type = %description.device_type,
            services = order.len(),
            "Root device created"
        );

        Ok(Self {
            udn,
            description_path: description.description_path,
            device_type: description.device_type,
            friendly_name: description.friendly_name,
            order,
            services,
            available: AtomicBool::new(config.initially_available),
        })
    }

    pub fn udn(&self) -> &str {
        &self.udn
    }

    pub fn description_path(&self) -> &Path {
        &self.description_path
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Hosted service types in description order
    pub fn service_types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn service(&self, service_type: &str) -> Option<Arc<ServiceMetadata>> {
        self.services.get(service_type).map(|slot| slot.metadata.clone())
    }

    fn slot(&self, service_type: &str) -> Result<&ServiceSlot> {
        self.services
            .get(service_type)
            .ok_or_else(|| ServiceError::UnknownServiceType(service_type.to_string()))
    }

    /// Slot of a service reachable from the network
    fn live_slot(&self, service_type: &str) -> Result<&ServiceSlot> {
        if !self.is_available() {
            return Err(ServiceError::DeviceUnavailable(self.udn.clone()));
        }
        self.slot(service_type)
    }

    /// Serve an inbound action call on one of the hosted services
    ///
    /// `Err` only when the device is unavailable or no such service is
    /// hosted; every dispatch problem is a fault inside the result.
    pub fn dispatch(&self, service_type: &str, invocation: ActionInvocation) -> Result<ActionResult> {
        let slot = self.live_slot(service_type)?;
        Ok(slot.handler.lock().dispatch(invocation))
    }

    /// Current value of a state variable, `Ok(None)` when unknown
    pub fn query(&self, service_type: &str, variable: &str) -> Result<Option<Value>> {
        let slot = self.live_slot(service_type)?;
        Ok(slot.handler.lock().query(variable))
    }

    /// Current values of every evented variable of a service
    pub fn evented_snapshot(&self, service_type: &str) -> Result<Vec<(String, Value)>> {
        let slot = self.slot(service_type)?;
        Ok(slot.handler.lock().evented_snapshot())
    }

    /// Notifier of a hosted service, for changes made outside an action
    pub fn notifier(&self, service_type: &str) -> Result<Notifier> {
        let slot = self.slot(service_type)?;
        Ok(slot.handler.lock().notifier().clone())
    }

    pub fn set_available(&self, available: bool) {
        let previous = self.available.swap(available, Ordering::SeqCst);
        if previous != available {
            tracing::info!(udn = %self.udn, available, "Device availability changed");
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RootDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootDevice")
            .field("udn", &self.udn)
            .field("device_type", &self.device_type)
            .field("services", &self.order)
            .field("available", &self.is_available())
            .finish()
    }
}
