//! Introspected service metadata and invocation validation
//!
//! `ServiceMetadata` is the full set of action and state-variable
//! descriptors of one service type. It can only be obtained through
//! [`ServiceMetadataBuilder::build`] (or deserialization, which runs the same
//! checks), so every instance upholds the description invariants:
//!
//! - action, state-variable and per-action argument names are unique
//! - every argument names a declared state variable
//! - enumerations are string variables, ranges are on numeric ones

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::descriptor::{ActionDescriptor, Direction, StateVariableDescriptor};
use crate::error::{ModelError, ValidationError};
use crate::invocation::ActionInvocation;

/// Validation levels for client-side invocation checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationLevel {
    /// No validation; the remote side is trusted to reject bad input
    None,
    /// Argument names must exactly match the action's IN arguments
    Boundary,
    /// Boundary checks plus type, bounds, range and allowed-value checks
    #[default]
    Comprehensive,
}

/// Action and state-variable descriptors of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MetadataDocument")]
pub struct ServiceMetadata {
    service_type: String,
    actions: Vec<ActionDescriptor>,
    state_variables: Vec<StateVariableDescriptor>,
}

/// Unchecked serialized form, validated on the way in
#[derive(Deserialize)]
struct MetadataDocument {
    service_type: String,
    #[serde(default)]
    actions: Vec<ActionDescriptor>,
    #[serde(default)]
    state_variables: Vec<StateVariableDescriptor>,
}

impl TryFrom<MetadataDocument> for ServiceMetadata {
    type Error = ModelError;

    fn try_from(doc: MetadataDocument) -> Result<Self, Self::Error> {
        ServiceMetadataBuilder {
            service_type: doc.service_type,
            actions: doc.actions,
            state_variables: doc.state_variables,
        }
        .build()
    }
}

impl ServiceMetadata {
    pub fn builder(service_type: impl Into<String>) -> ServiceMetadataBuilder {
        ServiceMetadataBuilder {
            service_type: service_type.into(),
            actions: Vec::new(),
            state_variables: Vec::new(),
        }
    }

    /// The service-type URN, e.g. `urn:schemas-upnp-org:service:SwitchPower:1`
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    pub fn state_variables(&self) -> &[StateVariableDescriptor] {
        &self.state_variables
    }

    pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|action| action.name == name)
    }

    pub fn state_variable(&self, name: &str) -> Option<&StateVariableDescriptor> {
        self.state_variables.iter().find(|var| var.name == name)
    }

    /// State variable backing `argument` of `action`
    pub fn related_variable(
        &self,
        action: &str,
        argument: &str,
    ) -> Result<&StateVariableDescriptor, ValidationError> {
        let descriptor = self
            .action(action)
            .ok_or_else(|| ValidationError::UnknownAction(action.to_string()))?;
        let arg = descriptor.get_argument(argument).ok_or_else(|| {
            ValidationError::UnexpectedArgument {
                action: action.to_string(),
                argument: argument.to_string(),
            }
        })?;
        self.state_variable(&arg.related_state_variable)
            .ok_or_else(|| ValidationError::UnknownStateVariable(arg.related_state_variable.clone()))
    }

    /// Allowed values of the enumeration backing `argument`, empty if the
    /// related variable is not an enumeration
    pub fn allowed_values(&self, action: &str, argument: &str) -> Result<&[String], ValidationError> {
        Ok(&self.related_variable(action, argument)?.allowed_values)
    }

    /// Check an invocation against the descriptor of its action
    pub fn validate_invocation(
        &self,
        invocation: &ActionInvocation,
        level: ValidationLevel,
    ) -> Result<(), ValidationError> {
        if level == ValidationLevel::None {
            return Ok(());
        }

        let name = invocation.action_name();
        let action = self
            .action(name)
            .ok_or_else(|| ValidationError::UnknownAction(name.to_string()))?;

        let mut supplied = HashSet::new();
        for (argument, _) in invocation.arguments() {
            if !supplied.insert(argument.as_str()) {
                return Err(ValidationError::DuplicateArgument {
                    argument: argument.clone(),
                });
            }
            match action.get_argument(argument) {
                Some(arg) if arg.direction == Direction::In => {}
                _ => {
                    return Err(ValidationError::UnexpectedArgument {
                        action: name.to_string(),
                        argument: argument.clone(),
                    })
                }
            }
        }

        if let Some(missing) = action
            .in_arguments()
            .find(|arg| !supplied.contains(arg.name.as_str()))
        {
            return Err(ValidationError::MissingArgument {
                action: name.to_string(),
                argument: missing.name.clone(),
            });
        }

        if level == ValidationLevel::Comprehensive {
            for (argument, value) in invocation.arguments() {
                self.related_variable(name, argument)?
                    .check(argument, value)?;
            }
        }

        Ok(())
    }
}

/// Builder that assembles and checks a [`ServiceMetadata`]
#[derive(Debug, Clone)]
pub struct ServiceMetadataBuilder {
    service_type: String,
    actions: Vec<ActionDescriptor>,
    state_variables: Vec<StateVariableDescriptor>,
}

impl ServiceMetadataBuilder {
    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.actions.push(action);
        self
    }

    pub fn state_variable(mut self, variable: StateVariableDescriptor) -> Self {
        self.state_variables.push(variable);
        self
    }

    pub fn build(self) -> Result<ServiceMetadata, ModelError> {
        if self.service_type.trim().is_empty() {
            return Err(ModelError::EmptyServiceType);
        }

        let mut variables = HashSet::new();
        for variable in &self.state_variables {
            if !variables.insert(variable.name.as_str()) {
                return Err(ModelError::DuplicateStateVariable(variable.name.clone()));
            }
            check_variable(variable)?;
        }

        let mut actions = HashSet::new();
        for action in &self.actions {
            if !actions.insert(action.name.as_str()) {
                return Err(ModelError::DuplicateAction(action.name.clone()));
            }

            let mut arguments = HashSet::new();
            for arg in &action.arguments {
                if !arguments.insert(arg.name.as_str()) {
                    return Err(ModelError::DuplicateArgument {
                        action: action.name.clone(),
                        argument: arg.name.clone(),
                    });
                }
                if !variables.contains(arg.related_state_variable.as_str()) {
                    return Err(ModelError::UnknownRelatedVariable {
                        action: action.name.clone(),
                        argument: arg.name.clone(),
                        variable: arg.related_state_variable.clone(),
                    });
                }
            }
        }

        Ok(ServiceMetadata {
            service_type: self.service_type,
            actions: self.actions,
            state_variables: self.state_variables,
        })
    }
}

fn check_variable(variable: &StateVariableDescriptor) -> Result<(), ModelError> {
    if variable.is_enumeration() && variable.data_type.value_kind() != "string" {
        return Err(ModelError::InvalidEnumeration(variable.name.clone()));
    }

    if let Some(range) = variable.allowed_range {
        let invalid = |reason: &str| ModelError::InvalidRange {
            variable: variable.name.clone(),
            reason: reason.to_string(),
        };
        if !variable.data_type.is_numeric() {
            return Err(invalid("range on a non-numeric variable"));
        }
        if range.minimum > range.maximum {
            return Err(invalid("minimum exceeds maximum"));
        }
        if range.step <= 0 {
            return Err(invalid("step must be positive"));
        }
    }

    if let Some(default) = &variable.default_value {
        variable
            .check(&variable.name, default)
            .map_err(|e| ModelError::InvalidDefault {
                variable: variable.name.clone(),
                reason: e.to_string(),
            })?;
    }

    Ok(())
}
