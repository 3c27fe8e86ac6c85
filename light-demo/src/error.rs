//! Error types for the demo programs

use thiserror::Error;
use upnp_core::ModelError;
use upnp_proxy::ProxyError;
use upnp_service::ServiceError;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("Invalid service description: {0}")]
    Model(#[from] ModelError),

    #[error("Hosting failed: {0}")]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("Action '{action}' has no allowed values for '{argument}'")]
    NoAllowedValues { action: String, argument: String },

    #[error("Action '{action}' did not return '{argument}'")]
    MissingOutput { action: String, argument: String },

    #[error("No {0} service became available")]
    NoService(String),
}
