//! Configuration for hosted devices

use crate::error::{Result, ServiceError};

/// Configuration shared by every service of a [`RootDevice`](crate::RootDevice)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Forward notifications for variables declared with `sendEvents="no"`
    /// Default: false (they are dropped with a warning)
    pub notify_unevented: bool,

    /// Maximum number of notifications held while a notifier is frozen;
    /// the oldest is dropped when full
    /// Default: 1000
    pub max_queued_notifications: usize,

    /// Start the device announced as available
    /// Default: true
    pub initially_available: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            notify_unevented: false,
            max_queued_notifications: 1000,
            initially_available: true,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward every notification, evented or not
    pub fn permissive() -> Self {
        Self {
            notify_unevented: true,
            ..Default::default()
        }
    }

    /// Small queue for short-lived test and demo devices
    pub fn minimal() -> Self {
        Self {
            max_queued_notifications: 16,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_queued_notifications == 0 {
            return Err(ServiceError::Configuration(
                "max_queued_notifications must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
