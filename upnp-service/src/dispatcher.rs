//! String-keyed action and query dispatch for one hosted service
//!
//! A [`Dispatcher`] owns the typed state of a service together with two
//! tables populated at registration time: action name to handler, and
//! state-variable name to query handler. Registration is checked against
//! the service's [`ServiceMetadata`]; dispatch itself never fails and turns
//! every problem into a fault inside the returned [`ActionResult`].

use std::collections::HashMap;
use std::sync::Arc;

use upnp_core::{ActionInvocation, ActionResult, Fault, ServiceMetadata, Value};

use crate::action::ServiceAction;
use crate::error::{Result, ServiceError};
use crate::notifier::Notifier;

/// Name of the action every service answers for querying a state variable
pub const QUERY_STATE_VARIABLE: &str = "QueryStateVariable";

/// IN argument of [`QUERY_STATE_VARIABLE`] naming the variable
pub const VAR_NAME: &str = "varName";

/// Handler serving one action
pub type ActionFn<S> = Box<dyn Fn(&mut S, &mut ServiceAction, &Notifier) + Send + Sync>;

/// Handler reporting the current value of one state variable
pub type QueryFn<S> = Box<dyn Fn(&S) -> Value + Send + Sync>;

/// Object-safe dispatch contract of a hosted service
///
/// The device holds its services as `Box<dyn ServiceHandler>`, so services
/// with different state types can live side by side.
pub trait ServiceHandler: Send {
    fn metadata(&self) -> &ServiceMetadata;

    /// Serve one inbound action call
    fn dispatch(&mut self, invocation: ActionInvocation) -> ActionResult;

    /// Current value of a state variable, `None` when no query handler exists
    fn query(&self, variable: &str) -> Option<Value>;

    /// Current values of every evented variable that has a query handler
    fn evented_snapshot(&self) -> Vec<(String, Value)>;

    fn notifier(&self) -> &Notifier;
}

/// Dispatch table and typed state of one service
pub struct Dispatcher<S> {
    metadata: Arc<ServiceMetadata>,
    notifier: Notifier,
    state: S,
    actions: HashMap<String, ActionFn<S>>,
    queries: HashMap<String, QueryFn<S>>,
}

impl<S> Dispatcher<S> {
    pub fn new(metadata: Arc<ServiceMetadata>, notifier: Notifier, state: S) -> Self {
        Self {
            metadata,
            notifier,
            state,
            actions: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    /// Register the handler of a declared action
    ///
    /// Registering the same name again replaces the earlier handler.
    pub fn on_action<F>(mut self, name: &str, handler: F) -> Result<Self>
    where
        F: Fn(&mut S, &mut ServiceAction, &Notifier) + Send + Sync + 'static,
    {
        if self.metadata.action(name).is_none() {
            return Err(ServiceError::UndeclaredAction {
                service_type: self.metadata.service_type().to_string(),
                action: name.to_string(),
            });
        }
        if self.actions.insert(name.to_string(), Box::new(handler)).is_some() {
            tracing::debug!(service = %self.metadata.service_type(), action = name, "Replaced action handler");
        }
        Ok(self)
    }

    /// Register the query handler of a declared state variable
    pub fn on_query<F>(mut self, name: &str, handler: F) -> Result<Self>
    where
        F: Fn(&S) -> Value + Send + Sync + 'static,
    {
        if self.metadata.state_variable(name).is_none() {
            return Err(ServiceError::UndeclaredVariable {
                service_type: self.metadata.service_type().to_string(),
                variable: name.to_string(),
            });
        }
        if self.queries.insert(name.to_string(), Box::new(handler)).is_some() {
            tracing::debug!(service = %self.metadata.service_type(), variable = name, "Replaced query handler");
        }
        Ok(self)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_query(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    fn query_state_variable(&self, invocation: &ActionInvocation) -> ActionResult {
        let Some(variable) = invocation.get(VAR_NAME).and_then(Value::as_str) else {
            tracing::debug!(service = %self.metadata.service_type(), "QueryStateVariable without varName");
            return Fault::invalid_args().into();
        };

        match self.query_value(variable) {
            Some(value) => ActionResult::Success(vec![(variable.to_string(), value)]),
            None => {
                tracing::debug!(
                    service = %self.metadata.service_type(),
                    variable,
                    "QueryStateVariable for unknown variable"
                );
                Fault::invalid_args().into()
            }
        }
    }

    fn query_value(&self, variable: &str) -> Option<Value> {
        self.queries.get(variable).map(|handler| handler(&self.state))
    }
}

impl<S: Send> ServiceHandler for Dispatcher<S> {
    fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    fn dispatch(&mut self, invocation: ActionInvocation) -> ActionResult {
        let service = self.metadata.service_type();
        tracing::debug!(
            service,
            action = invocation.action_name(),
            arguments = invocation.arguments().len(),
            "Dispatching action"
        );

        let Some(handler) = self.actions.get(invocation.action_name()) else {
            if invocation.action_name() == QUERY_STATE_VARIABLE {
                return self.query_state_variable(&invocation);
            }
            tracing::debug!(service, action = invocation.action_name(), "No handler, invalid action");
            return Fault::invalid_action().into();
        };

        let mut action = ServiceAction::new(invocation);
        handler(&mut self.state, &mut action, &self.notifier);
        action.finish()
    }

    fn query(&self, variable: &str) -> Option<Value> {
        let value = self.query_value(variable);
        if value.is_none() {
            tracing::debug!(service = %self.metadata.service_type(), variable, "Query for unknown variable");
        }
        value
    }

    fn evented_snapshot(&self) -> Vec<(String, Value)> {
        self.metadata
            .state_variables()
            .iter()
            .filter(|var| var.send_events)
            .filter_map(|var| {
                self.query_value(&var.name)
                    .map(|value| (var.name.clone(), value))
            })
            .collect()
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        let mut queries: Vec<_> = self.queries.keys().collect();
        queries.sort();
        f.debug_struct("Dispatcher")
            .field("service_type", &self.metadata.service_type())
            .field("actions", &actions)
            .field("queries", &queries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use rstest::rstest;
    use upnp_core::{
        ActionDescriptor, ArgumentDescriptor, ChannelSink, DataType, StateChange,
        StateVariableDescriptor,
    };

    struct Counter {
        count: u32,
    }

    fn metadata() -> Arc<ServiceMetadata> {
        Arc::new(
            ServiceMetadata::builder("urn:test:service:Counter:1")
                .state_variable(StateVariableDescriptor::new("Count", DataType::Ui4))
                .state_variable(StateVariableDescriptor::new("Label", DataType::String).evented(false))
                .action(ActionDescriptor::new("Increment"))
                .action(
                    ActionDescriptor::new("GetCount")
                        .argument(ArgumentDescriptor::output("CurrentCount", "Count").as_retval()),
                )
                .build()
                .unwrap(),
        )
    }

    fn counter() -> (Dispatcher<Counter>, tokio::sync::mpsc::UnboundedReceiver<StateChange>) {
        let metadata = metadata();
        let (sink, rx) = ChannelSink::new();
        let notifier = Notifier::new(&metadata, Arc::new(sink), &DeviceConfig::default());
        let dispatcher = Dispatcher::new(metadata, notifier, Counter { count: 0 })
            .on_action("Increment", |state: &mut Counter, action, notifier| {
                state.count += 1;
                notifier.notify("Count", state.count);
                action.return_success();
            })
            .unwrap()
            .on_action("GetCount", |state: &mut Counter, action, _| {
                action.set("CurrentCount", state.count).return_success();
            })
            .unwrap()
            .on_query("Count", |state: &Counter| Value::from(state.count))
            .unwrap()
            .on_query("Label", |_: &Counter| Value::from("counter"))
            .unwrap();
        (dispatcher, rx)
    }

    #[test]
    fn test_registered_action_runs() {
        let (mut dispatcher, mut rx) = counter();
        let result = dispatcher.dispatch(ActionInvocation::new("Increment"));
        assert_eq!(result, ActionResult::empty_success());
        assert_eq!(dispatcher.state().count, 1);
        assert_eq!(rx.try_recv().unwrap().value, Value::Int(1));

        let result = dispatcher.dispatch(ActionInvocation::new("GetCount"));
        assert_eq!(result.output("CurrentCount"), Some(&Value::Int(1)));
    }

    #[rstest]
    #[case("Decrement")]
    #[case("increment")]
    #[case("")]
    fn test_unknown_action_faults(#[case] name: &str) {
        let (mut dispatcher, _rx) = counter();
        let result = dispatcher.dispatch(ActionInvocation::new(name));
        assert_eq!(result, ActionResult::Fault(Fault::invalid_action()));
        assert_eq!(dispatcher.state().count, 0);
    }

    #[test]
    fn test_registration_rejects_undeclared_names() {
        let metadata = metadata();
        let notifier = Notifier::new(&metadata, Arc::new(upnp_core::NullSink), &DeviceConfig::default());

        let result = Dispatcher::new(metadata.clone(), notifier.clone(), ())
            .on_action("Reset", |_: &mut (), action, _| action.return_success());
        assert!(matches!(result, Err(ServiceError::UndeclaredAction { ref action, .. }) if action == "Reset"));

        let result = Dispatcher::new(metadata, notifier, ()).on_query("Total", |_: &()| Value::Int(0));
        assert!(matches!(result, Err(ServiceError::UndeclaredVariable { ref variable, .. }) if variable == "Total"));
    }

    #[test]
    fn test_query() {
        let (dispatcher, _rx) = counter();
        assert_eq!(dispatcher.query("Count"), Some(Value::Int(0)));
        assert_eq!(dispatcher.query("Missing"), None);
    }

    #[test]
    fn test_query_state_variable_action() {
        let (mut dispatcher, _rx) = counter();

        let result = dispatcher.dispatch(ActionInvocation::new(QUERY_STATE_VARIABLE).argument(VAR_NAME, "Count"));
        assert_eq!(result, ActionResult::Success(vec![("Count".to_string(), Value::Int(0))]));

        let unknown = dispatcher.dispatch(ActionInvocation::new(QUERY_STATE_VARIABLE).argument(VAR_NAME, "Nope"));
        assert_eq!(unknown, ActionResult::Fault(Fault::invalid_args()));

        let missing = dispatcher.dispatch(ActionInvocation::new(QUERY_STATE_VARIABLE));
        assert_eq!(missing, ActionResult::Fault(Fault::invalid_args()));
    }

    #[test]
    fn test_evented_snapshot_skips_unevented() {
        let (mut dispatcher, _rx) = counter();
        dispatcher.state_mut().count = 7;
        assert_eq!(dispatcher.evented_snapshot(), vec![("Count".to_string(), Value::Int(7))]);
    }

    #[test]
    fn test_handler_without_outcome_faults() {
        let metadata = metadata();
        let notifier = Notifier::new(&metadata, Arc::new(upnp_core::NullSink), &DeviceConfig::default());
        let mut dispatcher = Dispatcher::new(metadata, notifier, ())
            .on_action("GetCount", |_: &mut (), action, _| {
                action.set("CurrentCount", 3u32);
            })
            .unwrap();

        let fault = dispatcher.dispatch(ActionInvocation::new("GetCount")).into_result().unwrap_err();
        assert_eq!(fault.code, Fault::ACTION_FAILED);
        assert_eq!(fault.message, crate::action::NO_OUTCOME_MESSAGE);
    }
}
