//! The per-call object a handler works on

use upnp_core::{ActionInvocation, ActionResult, Fault, FromValue, ValidationError, Value};

/// Message of the fault returned when a handler signals no outcome
pub const NO_OUTCOME_MESSAGE: &str = "Action handler did not signal an outcome";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Success,
    Error(Fault),
}

/// An inbound action call being served
///
/// A handler reads IN arguments, sets OUT values with [`set`](Self::set), and
/// must end with exactly one of [`return_success`](Self::return_success) or
/// [`return_error`](Self::return_error). The first outcome wins.
#[derive(Debug)]
pub struct ServiceAction {
    name: String,
    arguments: Vec<(String, Value)>,
    outputs: Vec<(String, Value)>,
    outcome: Option<Outcome>,
}

impl ServiceAction {
    pub fn new(invocation: ActionInvocation) -> Self {
        let (name, arguments) = invocation.into_parts();
        Self {
            name,
            arguments,
            outputs: Vec::new(),
            outcome: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().map(|(name, _)| name.as_str())
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    /// Typed access to an IN argument
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, ValidationError> {
        let value = self
            .get_value(name)
            .ok_or_else(|| ValidationError::MissingArgument {
                action: self.name.clone(),
                argument: name.to_string(),
            })?;
        T::from_value(value).ok_or_else(|| ValidationError::type_mismatch(name, T::KIND, value.kind()))
    }

    /// Set an OUT argument, replacing an earlier value of the same name
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.outputs.iter_mut().find(|(out, _)| out == name) {
            Some((_, slot)) => *slot = value,
            None => self.outputs.push((name.to_string(), value)),
        }
        self
    }

    pub fn return_success(&mut self) {
        self.settle(Outcome::Success);
    }

    pub fn return_error(&mut self, code: u16, message: impl Into<String>) {
        self.settle(Outcome::Error(Fault::new(code, message)));
    }

    pub fn return_fault(&mut self, fault: Fault) {
        self.settle(Outcome::Error(fault));
    }

    /// Whether an outcome has been signaled
    pub fn is_answered(&self) -> bool {
        self.outcome.is_some()
    }

    fn settle(&mut self, outcome: Outcome) {
        if let Some(previous) = &self.outcome {
            tracing::warn!(
                action = %self.name,
                ?previous,
                ignored = ?outcome,
                "Action outcome signaled twice, keeping the first"
            );
            return;
        }
        self.outcome = Some(outcome);
    }

    /// Turn the served call into its result
    ///
    /// A handler that never signaled an outcome yields `501 Action Failed`;
    /// any OUT values it set are discarded.
    pub fn finish(self) -> ActionResult {
        match self.outcome {
            Some(Outcome::Success) => ActionResult::Success(self.outputs),
            Some(Outcome::Error(fault)) => ActionResult::Fault(fault),
            None => {
                tracing::warn!(action = %self.name, "{}", NO_OUTCOME_MESSAGE);
                ActionResult::Fault(Fault::action_failed(NO_OUTCOME_MESSAGE))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_target(value: bool) -> ServiceAction {
        ServiceAction::new(ActionInvocation::new("SetTarget").argument("newTargetValue", value))
    }

    #[test]
    fn test_typed_argument_access() {
        let action = set_target(true);
        assert_eq!(action.name(), "SetTarget");
        assert_eq!(action.argument_count(), 1);
        assert_eq!(action.get::<bool>("newTargetValue"), Ok(true));
        assert!(matches!(
            action.get::<String>("newTargetValue"),
            Err(ValidationError::TypeMismatch { expected: "string", found: "boolean", .. })
        ));
        assert!(matches!(
            action.get::<bool>("Missing"),
            Err(ValidationError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_success_carries_outputs_in_order() {
        let mut action = ServiceAction::new(ActionInvocation::new("GetVolume"));
        action.set("CurrentVolume", 10u16).set("Channel", "Master");
        action.set("CurrentVolume", 20u16);
        action.return_success();

        let result = action.finish();
        assert_eq!(
            result,
            ActionResult::Success(vec![
                ("CurrentVolume".to_string(), Value::Int(20)),
                ("Channel".to_string(), Value::from("Master")),
            ])
        );
    }

    #[test]
    fn test_error_discards_outputs() {
        let mut action = set_target(true);
        action.set("Ignored", 1u8);
        action.return_error(Fault::INVALID_ARGS, "Invalid Args");
        assert_eq!(action.finish(), ActionResult::Fault(Fault::invalid_args()));
    }

    #[test]
    fn test_first_outcome_wins() {
        let mut action = set_target(false);
        action.return_success();
        action.return_error(501, "late");
        assert!(action.is_answered());
        assert!(action.finish().is_success());
    }

    #[test]
    fn test_missing_outcome_faults() {
        let mut action = ServiceAction::new(ActionInvocation::new("GetStatus"));
        action.set("ResultStatus", true);
        assert!(!action.is_answered());

        let fault = action.finish().into_result().unwrap_err();
        assert_eq!(fault.code, Fault::ACTION_FAILED);
        assert_eq!(fault.message, NO_OUTCOME_MESSAGE);
    }
}
