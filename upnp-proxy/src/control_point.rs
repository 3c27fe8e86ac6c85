//! Discovery-driven creation of service proxies
//!
//! A [`ControlPoint`] watches the runtime's discovery announcements for one
//! target service type. Each newly available service instance becomes a
//! [`ServiceProxy`] emitted on the control point's channel; repeated
//! announcements of a known instance are ignored until it is announced
//! unavailable.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use upnp_core::{Announcement, Transport};

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::proxy::ServiceProxy;

/// Filters announcements for one service type and hands out proxies
#[derive(Clone)]
pub struct ControlPoint {
    target: String,
    transport: Arc<dyn Transport>,
    config: ProxyConfig,
    known: Arc<DashMap<String, ServiceProxy>>,
    proxies: mpsc::Sender<ServiceProxy>,
}

impl ControlPoint {
    /// Create a control point for `target`, returning the channel on which
    /// newly available proxies arrive
    pub fn new(
        target: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: ProxyConfig,
    ) -> Result<(Self, mpsc::Receiver<ServiceProxy>)> {
        config.validate()?;
        let (proxies, receiver) = mpsc::channel(config.announcement_buffer);

        Ok((
            Self {
                target: target.into(),
                transport,
                config,
                known: Arc::new(DashMap::new()),
                proxies,
            },
            receiver,
        ))
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn proxy(&self, id: &str) -> Option<ServiceProxy> {
        self.known.get(id).map(|entry| entry.value().clone())
    }

    /// Every currently known proxy
    pub fn proxies(&self) -> Vec<ServiceProxy> {
        self.known.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Process one announcement
    ///
    /// Returns `true` when it changed the set of known proxies.
    pub async fn handle_announcement(&self, announcement: Announcement) -> bool {
        let info = announcement.info();
        if info.service_type != self.target {
            tracing::trace!(service_type = %info.service_type, "Ignoring announcement for other service type");
            return false;
        }

        match announcement {
            Announcement::Available(info) => {
                let proxy = match self.known.entry(info.id()) {
                    Entry::Occupied(_) => {
                        tracing::trace!(proxy = %info.id(), "Duplicate announcement");
                        return false;
                    }
                    Entry::Vacant(slot) => {
                        let proxy = ServiceProxy::new(info, self.transport.clone(), self.config.clone());
                        slot.insert(proxy.clone());
                        proxy
                    }
                };

                tracing::info!(proxy = %proxy.id(), "Service proxy available");
                if self.proxies.send(proxy).await.is_err() {
                    tracing::debug!("Proxy receiver dropped, not emitting");
                }
                true
            }
            Announcement::Unavailable(info) => {
                let removed = self.known.remove(&info.id()).is_some();
                if removed {
                    tracing::info!(proxy = %info.id(), "Service proxy unavailable");
                }
                removed
            }
        }
    }

    /// Consume announcements until the channel closes
    pub async fn run(self, mut announcements: mpsc::Receiver<Announcement>) {
        tracing::debug!(target_type = %self.target, "Control point started");
        while let Some(announcement) = announcements.recv().await {
            self.handle_announcement(announcement).await;
        }
        tracing::debug!(target_type = %self.target, "Announcement channel closed, control point stopped");
    }
}

impl std::fmt::Debug for ControlPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPoint")
            .field("target", &self.target)
            .field("known", &self.known.len())
            .finish()
    }
}

/// Adapt the proxy channel into a `Stream`
pub fn proxy_stream(receiver: mpsc::Receiver<ServiceProxy>) -> impl Stream<Item = ServiceProxy> {
    stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|proxy| (proxy, receiver))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use upnp_core::{
        ActionInvocation, ActionResult, ServiceMetadata, ServiceProxyInfo, TransportError,
    };
    use url::Url;

    const SWITCH_POWER: &str = "urn:schemas-upnp-org:service:SwitchPower:1";

    struct Unreachable;

    #[async_trait::async_trait]
    impl Transport for Unreachable {
        async fn introspect(&self, service: &ServiceProxyInfo) -> std::result::Result<ServiceMetadata, TransportError> {
            Err(TransportError::NotFound(service.id()))
        }

        async fn call_action(
            &self,
            service: &ServiceProxyInfo,
            _invocation: ActionInvocation,
        ) -> std::result::Result<ActionResult, TransportError> {
            Err(TransportError::NotFound(service.id()))
        }
    }

    fn info(udn: &str, service_type: &str) -> ServiceProxyInfo {
        ServiceProxyInfo::new(udn, service_type, Url::parse("http://192.168.1.30:49152/desc.xml").unwrap())
    }

    fn control_point() -> (ControlPoint, mpsc::Receiver<ServiceProxy>) {
        ControlPoint::new(SWITCH_POWER, Arc::new(Unreachable), ProxyConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_filters_by_service_type() {
        let (cp, mut rx) = control_point();
        let other = info("uuid:tv", "urn:schemas-upnp-org:service:RenderingControl:1");
        assert!(!cp.handle_announcement(Announcement::Available(other)).await);
        assert!(cp.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deduplicates_by_id() {
        let (cp, mut rx) = control_point();
        let light = info("uuid:light", SWITCH_POWER);

        assert!(cp.handle_announcement(Announcement::Available(light.clone())).await);
        assert!(!cp.handle_announcement(Announcement::Available(light.clone())).await);

        let proxy = rx.try_recv().unwrap();
        assert_eq!(proxy.id(), light.id());
        assert!(rx.try_recv().is_err());
        assert_eq!(cp.len(), 1);
        assert!(cp.proxy(&light.id()).is_some());
    }

    #[tokio::test]
    async fn test_unavailable_forgets_proxy() {
        let (cp, mut rx) = control_point();
        let light = info("uuid:light", SWITCH_POWER);

        cp.handle_announcement(Announcement::Available(light.clone())).await;
        assert!(cp.handle_announcement(Announcement::Unavailable(light.clone())).await);
        assert!(!cp.handle_announcement(Announcement::Unavailable(light.clone())).await);
        assert!(cp.is_empty());

        cp.handle_announcement(Announcement::Available(light)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_run_until_channel_closes() {
        let (cp, rx) = control_point();
        let (tx, announcements) = mpsc::channel(8);

        let task = tokio::spawn(cp.clone().run(announcements));
        tx.send(Announcement::Available(info("uuid:a", SWITCH_POWER))).await.unwrap();
        tx.send(Announcement::Available(info("uuid:b", SWITCH_POWER))).await.unwrap();
        drop(tx);
        task.await.unwrap();
        drop(cp);

        let ids: Vec<_> = proxy_stream(rx).map(|proxy| proxy.info().udn.clone()).collect().await;
        assert_eq!(ids, vec!["uuid:a".to_string(), "uuid:b".to_string()]);
    }
}
