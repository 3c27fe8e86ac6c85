//! Action and state-variable descriptors
//!
//! Descriptors are the immutable, introspected shape of a service: which
//! actions it exposes, what arguments those take, and which state variables
//! give the arguments their types.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::invocation::Fault;
use crate::value::{DataType, Value};

/// Direction of an action argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// One argument of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub direction: Direction,
    /// State variable giving this argument its type and allowed values
    pub related_state_variable: String,
    /// Whether the argument is flagged as the action's return value
    #[serde(default)]
    pub retval: bool,
}

impl ArgumentDescriptor {
    pub fn input(name: impl Into<String>, related_state_variable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::In,
            related_state_variable: related_state_variable.into(),
            retval: false,
        }
    }

    pub fn output(name: impl Into<String>, related_state_variable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Out,
            related_state_variable: related_state_variable.into(),
            retval: false,
        }
    }

    pub fn as_retval(mut self) -> Self {
        self.retval = true;
        self
    }
}

/// A named, remotely invokable action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    pub arguments: Vec<ArgumentDescriptor>,
    /// Faults the action documents beyond the standard control errors
    #[serde(default)]
    pub errors: Vec<Fault>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn error(mut self, fault: Fault) -> Self {
        self.errors.push(fault);
        self
    }

    pub fn get_argument(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.arguments.iter().find(|arg| arg.name == name)
    }

    pub fn in_arguments(&self) -> impl Iterator<Item = &ArgumentDescriptor> {
        self.arguments
            .iter()
            .filter(|arg| arg.direction == Direction::In)
    }

    pub fn out_arguments(&self) -> impl Iterator<Item = &ArgumentDescriptor> {
        self.arguments
            .iter()
            .filter(|arg| arg.direction == Direction::Out)
    }
}

/// Inclusive numeric range with a step, from `allowedValueRange`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedRange {
    pub minimum: i64,
    pub maximum: i64,
    pub step: i64,
}

/// A named, externally observable value of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVariableDescriptor {
    pub name: String,
    pub data_type: DataType,
    /// Whether changes are delivered to event subscribers
    #[serde(default = "default_send_events")]
    pub send_events: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    /// Fixed ordered set of allowed values; non-empty makes this an enumeration
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub allowed_range: Option<AllowedRange>,
}

fn default_send_events() -> bool {
    true
}

impl StateVariableDescriptor {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            send_events: true,
            default_value: None,
            allowed_values: Vec::new(),
            allowed_range: None,
        }
    }

    /// A string variable restricted to `values`
    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_values: values.into_iter().map(Into::into).collect(),
            ..Self::new(name, DataType::String)
        }
    }

    pub fn evented(mut self, send_events: bool) -> Self {
        self.send_events = send_events;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_range(mut self, minimum: i64, maximum: i64, step: i64) -> Self {
        self.allowed_range = Some(AllowedRange {
            minimum,
            maximum,
            step,
        });
        self
    }

    pub fn is_enumeration(&self) -> bool {
        !self.allowed_values.is_empty()
    }

    /// Check `value`, supplied for `argument`, against this variable's type,
    /// bounds, allowed range and allowed-value set
    pub fn check(&self, argument: &str, value: &Value) -> Result<(), ValidationError> {
        if value.kind() != self.data_type.value_kind() {
            return Err(ValidationError::type_mismatch(
                argument,
                self.data_type.value_kind(),
                value.kind(),
            ));
        }

        if let (Some((min, max)), Value::Int(v)) = (self.data_type.bounds(), value) {
            if !(min..=max).contains(v) {
                return Err(ValidationError::OutOfRange {
                    argument: argument.to_string(),
                    value: *v,
                    min,
                    max,
                });
            }
        }

        if let (Some(range), Value::Int(v)) = (self.allowed_range, value) {
            if !(range.minimum..=range.maximum).contains(v) {
                return Err(ValidationError::OutOfRange {
                    argument: argument.to_string(),
                    value: *v,
                    min: range.minimum,
                    max: range.maximum,
                });
            }
            // Widened so ranges spanning more than i64::MAX cannot overflow
            let offset = i128::from(*v) - i128::from(range.minimum);
            if range.step > 1 && offset % i128::from(range.step) != 0 {
                return Err(ValidationError::OffStep {
                    argument: argument.to_string(),
                    value: *v,
                    min: range.minimum,
                    step: range.step,
                });
            }
        }

        if let (true, Value::String(v)) = (self.is_enumeration(), value) {
            if !self.allowed_values.iter().any(|allowed| allowed == v) {
                return Err(ValidationError::NotAllowed {
                    argument: argument.to_string(),
                    value: v.clone(),
                    allowed: self.allowed_values.clone(),
                });
            }
        }

        Ok(())
    }
}
