//! In-process transport over hosted devices
//!
//! `LoopbackTransport` satisfies the client-side [`Transport`] boundary by
//! routing introspection and action calls straight to attached
//! [`RootDevice`]s, with no network in between. It also produces the
//! discovery announcements a real runtime would emit for those devices.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use upnp_core::{
    ActionInvocation, ActionResult, Announcement, ServiceMetadata, ServiceProxyInfo, Transport,
    TransportError,
};
use url::Url;

use crate::device::RootDevice;
use crate::error::ServiceError;

/// Transport that answers from devices living in the same process
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    devices: Arc<RwLock<HashMap<String, Arc<RootDevice>>>>,
    latency: Option<Duration>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every round trip by `latency`, to exercise suspension points
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make a device reachable, replacing any device with the same UDN
    pub fn attach(&self, device: Arc<RootDevice>) {
        let udn = device.udn().to_string();
        tracing::debug!(udn = %udn, "Attaching device to loopback transport");
        self.devices.write().insert(udn, device);
    }

    pub fn detach(&self, udn: &str) -> Option<Arc<RootDevice>> {
        self.devices.write().remove(udn)
    }

    /// Location URL of a hosted service
    pub fn location(udn: &str, service_type: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse("loopback://local/")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(udn)
            .push(service_type);
        Ok(url)
    }

    /// Proxy info of every service hosted by the device `udn`
    pub fn services_of(&self, udn: &str) -> Vec<ServiceProxyInfo> {
        let Some(device) = self.devices.read().get(udn).cloned() else {
            return Vec::new();
        };
        proxy_infos(&device)
    }

    /// `Available` announcements for every service of every available device
    pub fn announcements(&self) -> Vec<Announcement> {
        let devices: Vec<_> = self.devices.read().values().cloned().collect();
        devices
            .iter()
            .filter(|device| device.is_available())
            .flat_map(|device| proxy_infos(device))
            .map(Announcement::Available)
            .collect()
    }

    fn device(&self, service: &ServiceProxyInfo) -> Result<Arc<RootDevice>, TransportError> {
        let device = self
            .devices
            .read()
            .get(&service.udn)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(service.udn.clone()))?;
        if !device.is_available() {
            return Err(TransportError::NotFound(service.udn.clone()));
        }
        Ok(device)
    }

    fn unreachable(service: &ServiceProxyInfo, error: ServiceError) -> TransportError {
        match error {
            ServiceError::DeviceUnavailable(udn) => TransportError::NotFound(udn),
            _ => TransportError::NotFound(service.id()),
        }
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn proxy_infos(device: &RootDevice) -> Vec<ServiceProxyInfo> {
    device
        .service_types()
        .filter_map(|service_type| match LoopbackTransport::location(device.udn(), service_type) {
            Ok(location) => Some(ServiceProxyInfo::new(device.udn(), service_type, location)),
            Err(e) => {
                tracing::warn!(udn = device.udn(), service_type, error = %e, "Skipping service with unrepresentable location");
                None
            }
        })
        .collect()
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn introspect(&self, service: &ServiceProxyInfo) -> Result<ServiceMetadata, TransportError> {
        self.delay().await;
        let device = self.device(service)?;
        let metadata = device
            .service(&service.service_type)
            .ok_or_else(|| TransportError::NotFound(service.id()))?;
        Ok(metadata.as_ref().clone())
    }

    async fn call_action(
        &self,
        service: &ServiceProxyInfo,
        invocation: ActionInvocation,
    ) -> Result<ActionResult, TransportError> {
        self.delay().await;
        let device = self.device(service)?;
        device
            .dispatch(&service.service_type, invocation)
            .map_err(|e| Self::unreachable(service, e))
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut udns: Vec<_> = self.devices.read().keys().cloned().collect();
        udns.sort();
        f.debug_struct("LoopbackTransport")
            .field("devices", &udns)
            .field("latency", &self.latency)
            .finish()
    }
}
