use thiserror::Error;

/// Errors raised while assembling or addressing server-side services
///
/// Dispatch itself never fails with one of these: an unknown action or a
/// misbehaving handler produces a fault inside the `ActionResult`. These
/// cover registration defects and addressing a service that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A handler was registered for an action the description does not declare
    #[error("Action '{action}' is not declared by {service_type}")]
    UndeclaredAction { service_type: String, action: String },

    /// A query handler was registered for an undeclared state variable
    #[error("State variable '{variable}' is not declared by {service_type}")]
    UndeclaredVariable {
        service_type: String,
        variable: String,
    },

    /// No service of this type lives on the device
    #[error("Unknown service type: {0}")]
    UnknownServiceType(String),

    /// The device has been withdrawn from the network
    #[error("Device {0} is not available")]
    DeviceUnavailable(String),

    /// The device description lists the same service type twice
    #[error("Service type {0} is described more than once")]
    DuplicateService(String),

    /// A registered factory refused to build its service
    #[error("Failed to create service {service_type}: {reason}")]
    FactoryFailed { service_type: String, reason: String },

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Type alias for results that can return a ServiceError
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ServiceError::UndeclaredAction {
            service_type: "urn:schemas-upnp-org:service:SwitchPower:1".to_string(),
            action: "Toggle".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Action 'Toggle' is not declared by urn:schemas-upnp-org:service:SwitchPower:1"
        );

        let error = ServiceError::UnknownServiceType("urn:x".to_string());
        assert_eq!(error.to_string(), "Unknown service type: urn:x");
    }
}
