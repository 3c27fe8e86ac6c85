//! Boundary to the underlying UPnP runtime
//!
//! The dispatch core never touches SSDP, HTTP or SOAP itself. It consumes a
//! [`Transport`] for introspection and action calls, receives discovery
//! [`Announcement`]s, and hands state-variable changes to an [`EventSink`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use crate::error::TransportError;
use crate::invocation::{ActionInvocation, ActionResult};
use crate::metadata::ServiceMetadata;
use crate::value::Value;

/// Identity and location of one remote service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceProxyInfo {
    /// Unique device name, e.g. `uuid:2fac1234-31f8-11b4-a222-08002b34c003`
    pub udn: String,
    pub service_type: String,
    /// Where the runtime reaches the service (description or control URL)
    pub location: Url,
}

impl ServiceProxyInfo {
    pub fn new(udn: impl Into<String>, service_type: impl Into<String>, location: Url) -> Self {
        Self {
            udn: udn.into(),
            service_type: service_type.into(),
            location,
        }
    }

    /// Stable identifier, unique per device and service type
    pub fn id(&self) -> String {
        format!("{}::{}", self.udn, self.service_type)
    }
}

/// Discovery notification delivered by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// A service instance appeared on the network
    Available(ServiceProxyInfo),
    /// A previously announced service instance went away
    Unavailable(ServiceProxyInfo),
}

impl Announcement {
    pub fn info(&self) -> &ServiceProxyInfo {
        match self {
            Self::Available(info) | Self::Unavailable(info) => info,
        }
    }
}

/// Asynchronous round trips provided by the UPnP runtime
///
/// Implementations must be cheap to share; one transport usually serves
/// every proxy of a control point.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the action and state-variable descriptors of a service
    async fn introspect(&self, service: &ServiceProxyInfo) -> Result<ServiceMetadata, TransportError>;

    /// Submit one action invocation and wait for its result
    ///
    /// A remote fault is a successful round trip carrying
    /// [`ActionResult::Fault`]; `Err` is reserved for transport failures.
    async fn call_action(
        &self,
        service: &ServiceProxyInfo,
        invocation: ActionInvocation,
    ) -> Result<ActionResult, TransportError>;
}

/// A state-variable change, as handed to the eventing subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub service_type: String,
    pub variable: String,
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl StateChange {
    pub fn new(service_type: impl Into<String>, variable: impl Into<String>, value: Value) -> Self {
        Self {
            service_type: service_type.into(),
            variable: variable.into(),
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Sink accepting state-variable change notifications
pub trait EventSink: Send + Sync {
    fn publish(&self, change: StateChange);
}

/// Event sink forwarding changes to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<StateChange>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StateChange>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: mpsc::UnboundedSender<StateChange>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, change: StateChange) {
        // A dropped receiver just means nobody is subscribed any more
        if self.sender.send(change).is_err() {
            tracing::trace!("State change dropped, no receiver");
        }
    }
}

/// Event sink that discards every change
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _change: StateChange) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ServiceProxyInfo {
        ServiceProxyInfo::new(
            "uuid:light-1",
            "urn:schemas-upnp-org:service:SwitchPower:1",
            Url::parse("http://192.168.1.20:49152/SwitchPower").unwrap(),
        )
    }

    #[test]
    fn test_proxy_info_id() {
        assert_eq!(
            info().id(),
            "uuid:light-1::urn:schemas-upnp-org:service:SwitchPower:1"
        );
        assert_eq!(Announcement::Unavailable(info()).info(), &info());
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_changes() {
        let (sink, mut rx) = ChannelSink::new();
        sink.publish(StateChange::new("urn:test", "Status", Value::Bool(true)));

        let change = rx.recv().await.unwrap();
        assert_eq!(change.variable, "Status");
        assert_eq!(change.value, Value::Bool(true));
    }

    #[test]
    fn test_channel_sink_ignores_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.publish(StateChange::new("urn:test", "Status", Value::Bool(false)));
    }
}
