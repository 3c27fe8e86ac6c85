//! State-variable change notifications
//!
//! Each service owns a `Notifier` in front of the device's event sink. A
//! handler calls [`Notifier::notify`] after changing hidden state; the
//! notifier checks the variable is declared and evented and forwards the
//! change, or queues it while notifications are frozen.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use upnp_core::{EventSink, ServiceMetadata, StateChange, Value};

use crate::config::DeviceConfig;

#[derive(Default)]
struct NotifyState {
    frozen: bool,
    queue: VecDeque<StateChange>,
}

struct NotifierInner {
    service_type: String,
    /// Declared variables and whether each is evented
    evented: HashMap<String, bool>,
    sink: Arc<dyn EventSink>,
    notify_unevented: bool,
    max_queued: usize,
    state: Mutex<NotifyState>,
}

/// Change-notification front end of one service
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    pub fn new(metadata: &ServiceMetadata, sink: Arc<dyn EventSink>, config: &DeviceConfig) -> Self {
        let evented = metadata
            .state_variables()
            .iter()
            .map(|var| (var.name.clone(), var.send_events))
            .collect();

        Self {
            inner: Arc::new(NotifierInner {
                service_type: metadata.service_type().to_string(),
                evented,
                sink,
                notify_unevented: config.notify_unevented,
                max_queued: config.max_queued_notifications,
                state: Mutex::new(NotifyState::default()),
            }),
        }
    }

    pub fn service_type(&self) -> &str {
        &self.inner.service_type
    }

    /// Announce that `variable` now holds `value`
    ///
    /// Returns whether the change was accepted (delivered or queued).
    pub fn notify(&self, variable: &str, value: impl Into<Value>) -> bool {
        let inner = &self.inner;
        match inner.evented.get(variable) {
            None => {
                tracing::warn!(
                    service = %inner.service_type,
                    variable,
                    "Notification for undeclared state variable dropped"
                );
                return false;
            }
            Some(false) if !inner.notify_unevented => {
                tracing::warn!(
                    service = %inner.service_type,
                    variable,
                    "Notification for non-evented state variable dropped"
                );
                return false;
            }
            Some(_) => {}
        }

        let change = StateChange::new(inner.service_type.clone(), variable, value.into());

        let mut state = inner.state.lock();
        if state.frozen {
            if state.queue.len() >= inner.max_queued {
                if let Some(dropped) = state.queue.pop_front() {
                    tracing::warn!(
                        service = %inner.service_type,
                        variable = %dropped.variable,
                        "Notification queue full, oldest change dropped"
                    );
                }
            }
            state.queue.push_back(change);
            return true;
        }
        drop(state);

        tracing::debug!(service = %inner.service_type, variable, value = %change.value, "Notifying change");
        inner.sink.publish(change);
        true
    }

    /// Queue notifications instead of sending them until [`thaw`](Self::thaw)
    pub fn freeze(&self) {
        self.inner.state.lock().frozen = true;
    }

    /// Send queued notifications in order and stop queuing
    pub fn thaw(&self) {
        let pending: Vec<StateChange> = {
            let mut state = self.inner.state.lock();
            state.frozen = false;
            state.queue.drain(..).collect()
        };

        if !pending.is_empty() {
            tracing::debug!(
                service = %self.inner.service_type,
                count = pending.len(),
                "Flushing queued notifications"
            );
        }
        for change in pending {
            self.inner.sink.publish(change);
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.state.lock().frozen
    }

    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("service_type", &self.inner.service_type)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnp_core::{ChannelSink, DataType, StateVariableDescriptor};

    fn metadata() -> ServiceMetadata {
        ServiceMetadata::builder("urn:schemas-upnp-org:service:SwitchPower:1")
            .state_variable(StateVariableDescriptor::new("Target", DataType::Boolean).evented(false))
            .state_variable(StateVariableDescriptor::new("Status", DataType::Boolean))
            .build()
            .unwrap()
    }

    fn notifier(config: DeviceConfig) -> (Notifier, tokio::sync::mpsc::UnboundedReceiver<StateChange>) {
        let (sink, rx) = ChannelSink::new();
        (Notifier::new(&metadata(), Arc::new(sink), &config), rx)
    }

    #[test]
    fn test_evented_variable_is_delivered() {
        let (notifier, mut rx) = notifier(DeviceConfig::default());
        assert!(notifier.notify("Status", true));

        let change = rx.try_recv().unwrap();
        assert_eq!(change.service_type, "urn:schemas-upnp-org:service:SwitchPower:1");
        assert_eq!(change.variable, "Status");
        assert_eq!(change.value, Value::Bool(true));
    }

    #[test]
    fn test_undeclared_and_unevented_are_dropped() {
        let (notifier, mut rx) = notifier(DeviceConfig::default());
        assert!(!notifier.notify("Brightness", 3u8));
        assert!(!notifier.notify("Target", true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unevented_allowed_by_config() {
        let config = DeviceConfig {
            notify_unevented: true,
            ..DeviceConfig::default()
        };
        let (notifier, mut rx) = notifier(config);
        assert!(notifier.notify("Target", true));
        assert_eq!(rx.try_recv().unwrap().variable, "Target");
    }

    #[test]
    fn test_freeze_queues_until_thaw() {
        let (notifier, mut rx) = notifier(DeviceConfig::default());
        notifier.freeze();
        notifier.notify("Status", true);
        notifier.notify("Status", false);
        assert!(notifier.is_frozen());
        assert_eq!(notifier.queued(), 2);
        assert!(rx.try_recv().is_err());

        notifier.thaw();
        assert!(!notifier.is_frozen());
        assert_eq!(rx.try_recv().unwrap().value, Value::Bool(true));
        assert_eq!(rx.try_recv().unwrap().value, Value::Bool(false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_frozen_queue_is_bounded() {
        let config = DeviceConfig {
            max_queued_notifications: 2,
            ..DeviceConfig::default()
        };
        let (notifier, mut rx) = notifier(config);
        notifier.freeze();
        for value in [true, false, true] {
            notifier.notify("Status", value);
        }
        assert_eq!(notifier.queued(), 2);

        notifier.thaw();
        assert_eq!(rx.try_recv().unwrap().value, Value::Bool(false));
        assert_eq!(rx.try_recv().unwrap().value, Value::Bool(true));
    }
}
