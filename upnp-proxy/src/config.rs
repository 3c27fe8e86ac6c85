//! Configuration types for the upnp-proxy crate
//!
//! Client-side round trips are unbounded by default: the whole-process
//! deadline of the main loop is the only timeout. Per-operation bounds can
//! be switched on here.

use std::time::Duration;

use upnp_core::ValidationLevel;

use crate::error::{ProxyError, Result};

/// Configuration shared by a control point and the proxies it creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Bound on one introspection round trip
    /// Default: None
    pub introspection_timeout: Option<Duration>,

    /// Bound on one action round trip
    /// Default: None
    pub action_timeout: Option<Duration>,

    /// Client-side checks applied before an invocation is submitted
    /// Default: Comprehensive
    pub validation: ValidationLevel,

    /// Capacity of the channel on which new proxies are emitted
    /// Default: 64
    pub announcement_buffer: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            introspection_timeout: None,
            action_timeout: None,
            validation: ValidationLevel::Comprehensive,
            announcement_buffer: 64,
        }
    }
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounded round trips for interactive tools
    pub fn interactive() -> Self {
        Self {
            introspection_timeout: Some(Duration::from_secs(5)),
            action_timeout: Some(Duration::from_secs(3)),
            ..Default::default()
        }
    }

    /// No client-side checks; the remote service validates
    pub fn trusting() -> Self {
        Self {
            validation: ValidationLevel::None,
            ..Default::default()
        }
    }

    pub fn with_validation(mut self, validation: ValidationLevel) -> Self {
        self.validation = validation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(ProxyError::InvalidConfig(reason.to_string()));

        if self.introspection_timeout == Some(Duration::ZERO) {
            return invalid("introspection_timeout must be greater than 0");
        }
        if self.action_timeout == Some(Duration::ZERO) {
            return invalid("action_timeout must be greater than 0");
        }
        if self.announcement_buffer == 0 {
            return invalid("announcement_buffer must be greater than 0");
        }
        Ok(())
    }
}
