//! Action invocations, results and faults

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::value::Value;

/// A single action call: the action name plus its IN arguments
///
/// An invocation is built per call and consumed by the transport or the
/// dispatcher; it is intentionally not `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct ActionInvocation {
    action: String,
    arguments: Vec<(String, Value)>,
}

impl ActionInvocation {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            arguments: Vec::new(),
        }
    }

    /// Append an IN argument, keeping insertion order
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.push((name.into(), value.into()));
        self
    }

    pub fn action_name(&self) -> &str {
        &self.action
    }

    pub fn arguments(&self) -> &[(String, Value)] {
        &self.arguments
    }

    /// First value supplied for `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    pub fn into_parts(self) -> (String, Vec<(String, Value)>) {
        (self.action, self.arguments)
    }
}

/// A structured UPnP control fault
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[error("UPnP fault {code}: {message}")]
pub struct Fault {
    pub code: u16,
    pub message: String,
}

impl Fault {
    pub const INVALID_ACTION: u16 = 401;
    pub const INVALID_ARGS: u16 = 402;
    pub const OUT_OF_SYNC: u16 = 403;
    pub const ACTION_FAILED: u16 = 501;

    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The fixed fault for an action no handler is registered for
    pub fn invalid_action() -> Self {
        Self::new(Self::INVALID_ACTION, "Invalid Action")
    }

    pub fn invalid_args() -> Self {
        Self::new(Self::INVALID_ARGS, "Invalid Args")
    }

    pub fn out_of_sync() -> Self {
        Self::new(Self::OUT_OF_SYNC, "Out of Sync")
    }

    pub fn action_failed(message: impl Into<String>) -> Self {
        Self::new(Self::ACTION_FAILED, message)
    }
}

/// Outcome of an action: named OUT values or a fault, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult {
    Success(Vec<(String, Value)>),
    Fault(Fault),
}

impl ActionResult {
    pub fn empty_success() -> Self {
        Self::Success(Vec::new())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn outputs(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Success(outputs) => Some(outputs),
            Self::Fault(_) => None,
        }
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs()?
            .iter()
            .find(|(out, _)| out == name)
            .map(|(_, value)| value)
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Success(_) => None,
            Self::Fault(fault) => Some(fault),
        }
    }

    pub fn into_result(self) -> Result<Vec<(String, Value)>, Fault> {
        match self {
            Self::Success(outputs) => Ok(outputs),
            Self::Fault(fault) => Err(fault),
        }
    }
}

/// Any argument problem surfaces to the remote caller as `402 Invalid Args`
impl From<ValidationError> for Fault {
    fn from(_: ValidationError) -> Self {
        Self::invalid_args()
    }
}

impl From<Fault> for ActionResult {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_keeps_argument_order() {
        let invocation = ActionInvocation::new("GetVolume")
            .argument("InstanceID", 0u32)
            .argument("Channel", "Master");

        assert_eq!(invocation.action_name(), "GetVolume");
        let names: Vec<_> = invocation.arguments().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["InstanceID", "Channel"]);
        assert_eq!(invocation.get("Channel"), Some(&Value::from("Master")));
        assert_eq!(invocation.get("Volume"), None);
    }

    #[test]
    fn test_fault_constructors() {
        let fault = Fault::invalid_action();
        assert_eq!(fault.code, 401);
        assert_eq!(fault.message, "Invalid Action");
        assert_eq!(fault.to_string(), "UPnP fault 401: Invalid Action");
        assert_eq!(Fault::invalid_args().code, Fault::INVALID_ARGS);
        assert_eq!(Fault::action_failed("boom").code, 501);

        let from_validation: Fault = ValidationError::UnknownStateVariable("X".to_string()).into();
        assert_eq!(from_validation, Fault::invalid_args());
    }

    #[test]
    fn test_result_accessors() {
        let success = ActionResult::Success(vec![("RetTargetValue".to_string(), Value::Bool(true))]);
        assert!(success.is_success());
        assert_eq!(success.output("RetTargetValue"), Some(&Value::Bool(true)));
        assert!(success.fault().is_none());

        let fault: ActionResult = Fault::invalid_action().into();
        assert!(!fault.is_success());
        assert!(fault.outputs().is_none());
        assert_eq!(fault.into_result().unwrap_err().code, 401);
    }
}
