//! Core types for UPnP action dispatch
//!
//! This crate holds everything the server-side dispatcher and the
//! client-side invoker share:
//!
//! - the service model: [`ActionDescriptor`], [`StateVariableDescriptor`]
//!   and the validated [`ServiceMetadata`] they form
//! - typed [`Value`]s and the UPnP [`DataType`]s they conform to
//! - per-call [`ActionInvocation`]s and their [`ActionResult`]s
//! - the [`Transport`] and [`EventSink`] traits behind which the real UPnP
//!   runtime (SSDP, HTTP, SOAP, GENA) lives
//! - an explicit [`MainLoop`] with a whole-process deadline
//!
//! # Example
//!
//! ```rust
//! use upnp_core::{
//!     ActionDescriptor, ActionInvocation, ArgumentDescriptor, DataType,
//!     ServiceMetadata, StateVariableDescriptor, ValidationLevel,
//! };
//!
//! let metadata = ServiceMetadata::builder("urn:schemas-upnp-org:service:SwitchPower:1")
//!     .state_variable(StateVariableDescriptor::new("Target", DataType::Boolean).evented(false))
//!     .state_variable(StateVariableDescriptor::new("Status", DataType::Boolean))
//!     .action(
//!         ActionDescriptor::new("SetTarget")
//!             .argument(ArgumentDescriptor::input("newTargetValue", "Target")),
//!     )
//!     .build()?;
//!
//! let invocation = ActionInvocation::new("SetTarget").argument("newTargetValue", true);
//! metadata.validate_invocation(&invocation, ValidationLevel::Comprehensive)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod descriptor;
pub mod error;
pub mod invocation;
pub mod logging;
pub mod main_loop;
pub mod metadata;
pub mod transport;
pub mod value;

pub use descriptor::{
    ActionDescriptor, AllowedRange, ArgumentDescriptor, Direction, StateVariableDescriptor,
};
pub use error::{ModelError, TransportError, TransportResult, ValidationError};
pub use invocation::{ActionInvocation, ActionResult, Fault};
pub use main_loop::{LoopExit, LoopHandle, MainLoop};
pub use metadata::{ServiceMetadata, ServiceMetadataBuilder, ValidationLevel};
pub use transport::{
    Announcement, ChannelSink, EventSink, NullSink, ServiceProxyInfo, StateChange, Transport,
};
pub use value::{DataType, FromValue, Value};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::descriptor::{ActionDescriptor, ArgumentDescriptor, StateVariableDescriptor};
    pub use crate::invocation::{ActionInvocation, ActionResult, Fault};
    pub use crate::metadata::{ServiceMetadata, ValidationLevel};
    pub use crate::transport::{EventSink, ServiceProxyInfo, Transport};
    pub use crate::value::{DataType, Value};
}
