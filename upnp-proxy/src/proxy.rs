//! Client-side handle on one remote service
//!
//! A [`ServiceProxy`] walks the client state machine:
//!
//! ```text
//! Idle -> Introspecting -> Ready -> Invoking -> ResultAvailable
//!               |            ^          |             |
//!               v            +----------+-------------+
//!      IntrospectionFailed
//! ```
//!
//! `IntrospectionFailed` is terminal and only reachable while nothing is
//! cached; a failed re-fetch keeps the cached metadata and the proxy stays
//! usable.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use upnp_core::{
    ActionInvocation, ActionResult, ServiceMetadata, ServiceProxyInfo, Transport, TransportError,
    ValidationError,
};

use crate::cache::IntrospectionCache;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::invoker::{ActionInvoker, OutputIter};

/// Client state of a service proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyState {
    /// Created, metadata not fetched yet
    Idle,
    /// First introspection in flight
    Introspecting,
    /// Metadata cached, no invocation in flight
    Ready,
    /// At least one invocation in flight
    Invoking,
    /// The last in-flight invocation completed
    ResultAvailable,
    /// The first introspection failed; no invocation is permitted
    IntrospectionFailed,
}

impl ProxyState {
    pub fn can_invoke(&self) -> bool {
        matches!(self, Self::Ready | Self::Invoking | Self::ResultAvailable)
    }
}

struct ProxyInner {
    info: ServiceProxyInfo,
    transport: Arc<dyn Transport>,
    config: ProxyConfig,
    cache: IntrospectionCache,
    status: Mutex<Status>,
}

/// State and in-flight count, always changed together
struct Status {
    state: ProxyState,
    in_flight: usize,
}

/// Clonable handle on a discovered remote service
///
/// Clones share the introspection cache and state.
#[derive(Clone)]
pub struct ServiceProxy {
    inner: Arc<ProxyInner>,
}

impl ServiceProxy {
    pub fn new(info: ServiceProxyInfo, transport: Arc<dyn Transport>, config: ProxyConfig) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                info,
                transport,
                config,
                cache: IntrospectionCache::new(),
                status: Mutex::new(Status {
                    state: ProxyState::Idle,
                    in_flight: 0,
                }),
            }),
        }
    }

    pub fn info(&self) -> &ServiceProxyInfo {
        &self.inner.info
    }

    /// `<udn>::<service-type>`
    pub fn id(&self) -> String {
        self.inner.info.id()
    }

    pub fn service_type(&self) -> &str {
        &self.inner.info.service_type
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ProxyState {
        self.inner.status.lock().state
    }

    /// Cached metadata, `None` before the first successful introspection
    pub fn metadata(&self) -> Option<Arc<ServiceMetadata>> {
        self.inner.cache.get()
    }

    /// Number of invocations currently awaiting a response
    pub fn in_flight(&self) -> usize {
        self.inner.status.lock().in_flight
    }

    fn transition(&self, status: &mut Status, to: ProxyState) {
        if status.state != to {
            tracing::trace!(proxy = %self.inner.info.id(), from = ?status.state, to = ?to, "Proxy state change");
            status.state = to;
        }
    }

    /// Fetch the service's action and state-variable descriptors
    ///
    /// The first successful fetch moves the proxy to `Ready`. A failing fetch
    /// while nothing is cached makes the proxy unusable for good; once
    /// metadata is cached a failing re-fetch only returns the error.
    /// Concurrent fetches settle against the state they find on completion.
    pub async fn introspect(&self) -> Result<Arc<ServiceMetadata>> {
        {
            let mut status = self.inner.status.lock();
            match status.state {
                ProxyState::IntrospectionFailed => return Err(ProxyError::InvalidState(status.state)),
                ProxyState::Idle => self.transition(&mut status, ProxyState::Introspecting),
                _ => {}
            }
        }

        let id = self.inner.info.id();
        tracing::debug!(proxy = %id, "Introspecting service");

        let fetched = bounded(
            self.inner.config.introspection_timeout,
            self.inner.transport.introspect(&self.inner.info),
        )
        .await;

        let mut status = self.inner.status.lock();
        match (fetched, status.state) {
            (_, ProxyState::IntrospectionFailed) => {
                tracing::debug!(proxy = %id, "Introspection settled after the proxy failed");
                Err(ProxyError::InvalidState(ProxyState::IntrospectionFailed))
            }
            (Ok(metadata), state) => {
                if self.inner.cache.store(metadata) && state != ProxyState::Introspecting {
                    tracing::info!(proxy = %id, "Service metadata changed on re-fetch");
                }
                if state == ProxyState::Introspecting {
                    self.transition(&mut status, ProxyState::Ready);
                }
                self.inner
                    .cache
                    .get()
                    .ok_or_else(|| ProxyError::NotIntrospected(id))
            }
            (Err(source), _) if !self.inner.cache.is_populated() => {
                tracing::warn!(proxy = %id, error = %source, "Introspection failed");
                self.transition(&mut status, ProxyState::IntrospectionFailed);
                Err(ProxyError::IntrospectionFailed { service: id, source })
            }
            (Err(source), _) => {
                tracing::warn!(proxy = %id, error = %source, "Re-fetch failed, keeping cached metadata");
                Err(ProxyError::Transport(source))
            }
        }
    }

    fn ready_metadata(&self) -> Result<Arc<ServiceMetadata>> {
        let status = self.inner.status.lock();
        if status.state == ProxyState::IntrospectionFailed {
            return Err(ProxyError::InvalidState(status.state));
        }
        self.inner
            .cache
            .get()
            .ok_or_else(|| ProxyError::NotIntrospected(self.inner.info.id()))
    }

    /// Start building an invocation of `name`
    pub fn action(&self, name: &str) -> Result<ActionInvoker> {
        let metadata = self.ready_metadata()?;
        ActionInvoker::new(self.clone(), metadata, name)
    }

    /// Validate and submit one invocation, yielding its OUT arguments
    ///
    /// A remote fault comes back as [`ProxyError::RemoteFault`]. Dropping
    /// the returned future abandons the call locally only.
    pub async fn invoke(&self, invocation: ActionInvocation) -> Result<OutputIter> {
        let metadata = self.ready_metadata()?;
        metadata
            .validate_invocation(&invocation, self.inner.config.validation)
            .map_err(|error| match error {
                ValidationError::UnknownAction(name) => ProxyError::UnknownAction(name),
                other => ProxyError::Validation(other),
            })?;

        let id = self.inner.info.id();
        tracing::debug!(
            proxy = %id,
            action = invocation.action_name(),
            arguments = invocation.arguments().len(),
            "Invoking action"
        );

        let mut guard = InFlight::enter(self);
        let response = bounded(
            self.inner.config.action_timeout,
            self.inner.transport.call_action(&self.inner.info, invocation),
        )
        .await;
        guard.completed = true;
        drop(guard);

        match response? {
            ActionResult::Success(outputs) => Ok(OutputIter::new(outputs)),
            ActionResult::Fault(fault) => {
                tracing::debug!(proxy = %id, code = fault.code, message = %fault.message, "Remote fault");
                Err(fault.into())
            }
        }
    }
}

impl std::fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.inner.status.lock();
        f.debug_struct("ServiceProxy")
            .field("id", &self.inner.info.id())
            .field("state", &status.state)
            .field("in_flight", &status.in_flight)
            .finish()
    }
}

/// Tracks one in-flight invocation and settles the state when it ends
struct InFlight<'a> {
    proxy: &'a ServiceProxy,
    completed: bool,
}

impl<'a> InFlight<'a> {
    fn enter(proxy: &'a ServiceProxy) -> Self {
        let mut status = proxy.inner.status.lock();
        status.in_flight += 1;
        proxy.transition(&mut status, ProxyState::Invoking);
        Self {
            proxy,
            completed: false,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut status = self.proxy.inner.status.lock();
        status.in_flight = status.in_flight.saturating_sub(1);
        if status.in_flight == 0 {
            // An abandoned last call leaves no result to read
            let next = if self.completed {
                ProxyState::ResultAvailable
            } else {
                ProxyState::Ready
            };
            self.proxy.transition(&mut status, next);
        }
    }
}

async fn bounded<T, F>(limit: Option<Duration>, future: F) -> std::result::Result<T, TransportError>
where
    F: Future<Output = std::result::Result<T, TransportError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => future.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use upnp_core::{ActionDescriptor, DataType, StateVariableDescriptor, Value};
    use url::Url;

    /// Transport answering from fixed metadata, echoing every call
    struct StaticTransport {
        metadata: ServiceMetadata,
        delay: Duration,
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn introspect(&self, _service: &ServiceProxyInfo) -> std::result::Result<ServiceMetadata, TransportError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.metadata.clone())
        }

        async fn call_action(
            &self,
            _service: &ServiceProxyInfo,
            invocation: ActionInvocation,
        ) -> std::result::Result<ActionResult, TransportError> {
            tokio::time::sleep(self.delay).await;
            Ok(ActionResult::Success(vec![(
                "Echo".to_string(),
                Value::from(invocation.action_name()),
            )]))
        }
    }

    fn proxy(delay: Duration, config: ProxyConfig) -> ServiceProxy {
        let metadata = ServiceMetadata::builder("urn:test:service:Echo:1")
            .state_variable(StateVariableDescriptor::new("Echo", DataType::String))
            .action(ActionDescriptor::new("Ping"))
            .build()
            .unwrap();
        let info = ServiceProxyInfo::new(
            "uuid:echo",
            "urn:test:service:Echo:1",
            Url::parse("http://127.0.0.1:49152/echo").unwrap(),
        );
        ServiceProxy::new(info, Arc::new(StaticTransport { metadata, delay }), config)
    }

    #[tokio::test]
    async fn test_invocation_before_introspection() {
        let proxy = proxy(Duration::ZERO, ProxyConfig::default());
        assert_eq!(proxy.state(), ProxyState::Idle);
        assert!(matches!(proxy.action("Ping"), Err(ProxyError::NotIntrospected(_))));
        assert!(matches!(
            proxy.invoke(ActionInvocation::new("Ping")).await,
            Err(ProxyError::NotIntrospected(_))
        ));
    }

    #[tokio::test]
    async fn test_state_walk() {
        let proxy = proxy(Duration::ZERO, ProxyConfig::default());
        proxy.introspect().await.unwrap();
        assert_eq!(proxy.state(), ProxyState::Ready);

        let outputs: Vec<_> = proxy.invoke(ActionInvocation::new("Ping")).await.unwrap().collect();
        assert_eq!(outputs, vec![("Echo".to_string(), Value::from("Ping"))]);
        assert_eq!(proxy.state(), ProxyState::ResultAvailable);

        // Result state re-enters invoking
        proxy.invoke(ActionInvocation::new("Ping")).await.unwrap();
        assert_eq!(proxy.state(), ProxyState::ResultAvailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoking_while_in_flight() {
        let proxy = proxy(Duration::from_secs(1), ProxyConfig::default());
        proxy.introspect().await.unwrap();

        let call = {
            let proxy = proxy.clone();
            tokio::spawn(async move { proxy.invoke(ActionInvocation::new("Ping")).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(proxy.state(), ProxyState::Invoking);
        assert_eq!(proxy.in_flight(), 1);

        call.await.unwrap().unwrap();
        assert_eq!(proxy.state(), ProxyState::ResultAvailable);
        assert_eq!(proxy.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_calls_stay_invoking_until_last_ends() {
        let proxy = proxy(Duration::from_secs(1), ProxyConfig::default());
        proxy.introspect().await.unwrap();

        let spawn_call = |proxy: &ServiceProxy| {
            let proxy = proxy.clone();
            tokio::spawn(async move { proxy.invoke(ActionInvocation::new("Ping")).await })
        };
        let first = spawn_call(&proxy);
        tokio::time::sleep(Duration::from_millis(500)).await;
        let second = spawn_call(&proxy);
        tokio::task::yield_now().await;
        assert_eq!(proxy.in_flight(), 2);

        first.await.unwrap().unwrap();
        assert_eq!(proxy.in_flight(), 1);
        assert_eq!(proxy.state(), ProxyState::Invoking);

        second.await.unwrap().unwrap();
        assert_eq!(proxy.in_flight(), 0);
        assert_eq!(proxy.state(), ProxyState::ResultAvailable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_call_returns_to_ready() {
        let proxy = proxy(Duration::from_secs(10), ProxyConfig::default());
        proxy.introspect().await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            proxy.invoke(ActionInvocation::new("Ping")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(proxy.in_flight(), 0);
        assert_eq!(proxy.state(), ProxyState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_timeout() {
        let config = ProxyConfig {
            action_timeout: Some(Duration::from_millis(500)),
            ..ProxyConfig::default()
        };
        let proxy = proxy(Duration::from_secs(2), config);
        proxy.introspect().await.unwrap();

        let result = proxy.invoke(ActionInvocation::new("Ping")).await;
        assert!(matches!(
            result,
            Err(ProxyError::Transport(TransportError::Timeout(d))) if d == Duration::from_millis(500)
        ));
    }

    #[tokio::test]
    async fn test_unknown_action_rejected_locally() {
        let proxy = proxy(Duration::ZERO, ProxyConfig::default());
        proxy.introspect().await.unwrap();

        assert!(matches!(
            proxy.invoke(ActionInvocation::new("Pong")).await,
            Err(ProxyError::UnknownAction(ref name)) if name == "Pong"
        ));
        assert!(matches!(proxy.action("Pong"), Err(ProxyError::UnknownAction(_))));
        assert_eq!(proxy.state(), ProxyState::Ready);
    }

    #[tokio::test]
    async fn test_trusting_config_submits_anything() {
        let proxy = proxy(Duration::ZERO, ProxyConfig::trusting());
        proxy.introspect().await.unwrap();

        let mut outputs = proxy.invoke(ActionInvocation::new("Pong").argument("X", 1u8)).await.unwrap();
        assert_eq!(outputs.next(), Some(("Echo".to_string(), Value::from("Pong"))));
    }
}
