//! The SwitchPower service of a binary light
//!
//! Hidden state is a single `target` flag. `Status` mirrors it and is
//! evented; `Target` is not.

use upnp_core::{
    ActionDescriptor, ArgumentDescriptor, DataType, Fault, ModelError, ServiceMetadata,
    StateVariableDescriptor, Value,
};
use upnp_service::{Dispatcher, Notifier, ResourceRegistry, ServiceAction, ServiceHandler};

pub const SWITCH_POWER: &str = "urn:schemas-upnp-org:service:SwitchPower:1";
pub const BINARY_LIGHT: &str = "urn:schemas-upnp-org:device:BinaryLight:1";

/// SwitchPower:1 as described by a binary light
pub fn metadata() -> Result<ServiceMetadata, ModelError> {
    ServiceMetadata::builder(SWITCH_POWER)
        .state_variable(
            StateVariableDescriptor::new("Target", DataType::Boolean)
                .evented(false)
                .with_default(false),
        )
        .state_variable(StateVariableDescriptor::new("Status", DataType::Boolean).with_default(false))
        .action(
            ActionDescriptor::new("SetTarget")
                .argument(ArgumentDescriptor::input("newTargetValue", "Target")),
        )
        .action(
            ActionDescriptor::new("GetTarget")
                .argument(ArgumentDescriptor::output("RetTargetValue", "Target").as_retval()),
        )
        .action(
            ActionDescriptor::new("GetStatus")
                .argument(ArgumentDescriptor::output("ResultStatus", "Status").as_retval()),
        )
        .build()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPower {
    pub target: bool,
}

impl SwitchPower {
    fn set_target(&mut self, action: &mut ServiceAction, notifier: &Notifier) {
        let value = match action.get::<bool>("newTargetValue") {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting SetTarget");
                action.return_fault(Fault::invalid_args());
                return;
            }
        };

        if self.target != value {
            self.target = value;
            notifier.notify("Status", value);
        }
        action.return_success();
    }

    fn get_target(&mut self, action: &mut ServiceAction, _: &Notifier) {
        action.set("RetTargetValue", self.target).return_success();
    }

    fn get_status(&mut self, action: &mut ServiceAction, _: &Notifier) {
        action.set("ResultStatus", self.target).return_success();
    }
}

/// Dispatcher serving SwitchPower over `state`
pub fn dispatcher(
    metadata: std::sync::Arc<ServiceMetadata>,
    notifier: Notifier,
    state: SwitchPower,
) -> upnp_service::Result<Dispatcher<SwitchPower>> {
    Dispatcher::new(metadata, notifier, state)
        .on_action("SetTarget", SwitchPower::set_target)?
        .on_action("GetTarget", SwitchPower::get_target)?
        .on_action("GetStatus", SwitchPower::get_status)?
        .on_query("Target", |light: &SwitchPower| Value::Bool(light.target))?
        .on_query("Status", |light: &SwitchPower| Value::Bool(light.target))
}

/// Register SwitchPower with a light that starts switched off
pub fn register(registry: &mut ResourceRegistry) {
    registry.register_resource_type(SWITCH_POWER, |metadata, notifier| {
        let service = dispatcher(metadata, notifier, SwitchPower::default())?;
        Ok(Box::new(service) as Box<dyn ServiceHandler>)
    });
}
