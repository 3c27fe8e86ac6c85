//! Error types shared by both sides of the dispatch core

use std::time::Duration;
use thiserror::Error;

/// Errors raised while checking an invocation against a service's metadata
///
/// These are caller-side rejections: on the client they stop an invocation
/// before it is submitted, on the server a handler maps them to a
/// `402 Invalid Args` fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Action '{0}' is not declared by the service")]
    UnknownAction(String),

    #[error("State variable '{0}' is not declared by the service")]
    UnknownStateVariable(String),

    #[error("Action '{action}' requires argument '{argument}'")]
    MissingArgument { action: String, argument: String },

    #[error("Action '{action}' has no input argument '{argument}'")]
    UnexpectedArgument { action: String, argument: String },

    #[error("Argument '{argument}' was supplied more than once")]
    DuplicateArgument { argument: String },

    #[error("Argument '{argument}' expects a {expected} value, got {found}")]
    TypeMismatch {
        argument: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Argument '{argument}' value '{value}' is not one of {allowed:?}")]
    NotAllowed {
        argument: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Argument '{argument}' value {value} is out of range ({min}..={max})")]
    OutOfRange {
        argument: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Argument '{argument}' value {value} is not a multiple of step {step} from {min}")]
    OffStep {
        argument: String,
        value: i64,
        min: i64,
        step: i64,
    },
}

impl ValidationError {
    pub fn type_mismatch(argument: &str, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            argument: argument.to_string(),
            expected,
            found,
        }
    }
}

/// Errors raised while assembling a `ServiceMetadata`
///
/// Every one of these is a registration-time defect in the description,
/// never something a remote peer can trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Service type must not be empty")]
    EmptyServiceType,

    #[error("Action '{0}' is declared more than once")]
    DuplicateAction(String),

    #[error("State variable '{0}' is declared more than once")]
    DuplicateStateVariable(String),

    #[error("Action '{action}' declares argument '{argument}' more than once")]
    DuplicateArgument { action: String, argument: String },

    #[error("Argument '{argument}' of action '{action}' refers to unknown state variable '{variable}'")]
    UnknownRelatedVariable {
        action: String,
        argument: String,
        variable: String,
    },

    #[error("State variable '{0}' lists allowed values but is not a string")]
    InvalidEnumeration(String),

    #[error("State variable '{variable}' has an invalid allowed range: {reason}")]
    InvalidRange { variable: String, reason: String },

    #[error("State variable '{variable}' has an invalid default value: {reason}")]
    InvalidDefault { variable: String, reason: String },
}

/// Errors reported by the underlying UPnP transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The round trip could not be completed
    #[error("Network error: {0}")]
    Network(String),

    /// The round trip did not complete within the configured bound
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// No device or service answers at the proxy's location
    #[error("Service not found: {0}")]
    NotFound(String),

    /// The peer answered with something the transport could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Type alias for transport results
pub type TransportResult<T> = std::result::Result<T, TransportError>;
