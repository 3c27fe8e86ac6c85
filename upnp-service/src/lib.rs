//! Server-side UPnP action dispatch and state-variable queries
//!
//! A hosted service is a [`Dispatcher`]: an explicit table from action name
//! to handler and from state-variable name to query handler, over typed
//! service state. Services are created per service type through a
//! [`ResourceRegistry`] and grouped into a [`RootDevice`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use upnp_core::{
//!     ActionDescriptor, ActionInvocation, ArgumentDescriptor, DataType, NullSink,
//!     ServiceMetadata, StateVariableDescriptor, Value,
//! };
//! use upnp_service::{DeviceConfig, DeviceDescription, Dispatcher, ResourceRegistry, RootDevice};
//!
//! const SWITCH_POWER: &str = "urn:schemas-upnp-org:service:SwitchPower:1";
//!
//! let metadata = ServiceMetadata::builder(SWITCH_POWER)
//!     .state_variable(StateVariableDescriptor::new("Status", DataType::Boolean))
//!     .action(
//!         ActionDescriptor::new("GetStatus")
//!             .argument(ArgumentDescriptor::output("ResultStatus", "Status")),
//!     )
//!     .build()?;
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register_resource_type(SWITCH_POWER, |metadata, notifier| {
//!     let service = Dispatcher::new(metadata, notifier, false)
//!         .on_action("GetStatus", |on: &mut bool, action, _| {
//!             action.set("ResultStatus", *on).return_success();
//!         })?
//!         .on_query("Status", |on: &bool| Value::Bool(*on))?;
//!     Ok(Box::new(service))
//! });
//!
//! let description = DeviceDescription::new("BinaryLight1.xml", "urn:schemas-upnp-org:device:BinaryLight:1")
//!     .with_service(metadata);
//! let device = RootDevice::new(description, &registry, Arc::new(NullSink), DeviceConfig::default())?;
//!
//! let result = device.dispatch(SWITCH_POWER, ActionInvocation::new("GetStatus"))?;
//! assert_eq!(result.output("ResultStatus"), Some(&Value::Bool(false)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod action;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod loopback;
pub mod notifier;
pub mod registry;

pub use action::{ServiceAction, NO_OUTCOME_MESSAGE};
pub use config::DeviceConfig;
pub use device::{DeviceDescription, RootDevice};
pub use dispatcher::{
    ActionFn, Dispatcher, QueryFn, ServiceHandler, QUERY_STATE_VARIABLE, VAR_NAME,
};
pub use error::{Result, ServiceError};
pub use loopback::LoopbackTransport;
pub use notifier::Notifier;
pub use registry::{ResourceRegistry, ServiceFactory};
