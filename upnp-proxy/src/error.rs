use thiserror::Error;
use upnp_core::{Fault, TransportError, ValidationError};

use crate::proxy::ProxyState;

/// Errors surfaced to callers of a service proxy
///
/// Each failure aborts only the operation that hit it; the proxy stays
/// usable unless its first introspection failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxyError {
    /// The first introspection round trip failed; the proxy is unusable
    #[error("Introspection of {service} failed: {source}")]
    IntrospectionFailed {
        service: String,
        #[source]
        source: TransportError,
    },

    /// An action was requested before introspection completed
    #[error("Service {0} has not been introspected")]
    NotIntrospected(String),

    /// The introspected service does not declare this action
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Client-side validation rejected the invocation before submission
    #[error("Invalid invocation: {0}")]
    Validation(#[from] ValidationError),

    /// The remote service answered with a fault
    #[error("Remote fault {code}: {message}")]
    RemoteFault { code: u16, message: String },

    /// The round trip itself failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The operation is not permitted in the proxy's current state
    #[error("Operation not permitted in state {0:?}")]
    InvalidState(ProxyState),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProxyError {
    /// Fault code of a remote fault
    pub fn fault_code(&self) -> Option<u16> {
        match self {
            Self::RemoteFault { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<Fault> for ProxyError {
    fn from(fault: Fault) -> Self {
        Self::RemoteFault {
            code: fault.code,
            message: fault.message,
        }
    }
}

/// Type alias for results that can return a ProxyError
pub type Result<T> = std::result::Result<T, ProxyError>;
