//! A minimal RenderingControl service with per-channel volume

use std::collections::HashMap;
use std::sync::Arc;

use upnp_core::{
    ActionDescriptor, ArgumentDescriptor, DataType, Fault, ModelError, ServiceMetadata,
    StateVariableDescriptor, Value,
};
use upnp_service::{Dispatcher, Notifier, ResourceRegistry, ServiceAction, ServiceHandler};

pub const RENDERING_CONTROL: &str = "urn:schemas-upnp-org:service:RenderingControl:1";
pub const MEDIA_RENDERER: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";

/// Channels in the order the description lists them
pub const CHANNELS: [&str; 3] = ["Master", "LF", "RF"];

const INVALID_INSTANCE_ID: u16 = 702;

pub fn metadata() -> Result<ServiceMetadata, ModelError> {
    ServiceMetadata::builder(RENDERING_CONTROL)
        .state_variable(StateVariableDescriptor::new("A_ARG_TYPE_InstanceID", DataType::Ui4).evented(false))
        .state_variable(StateVariableDescriptor::enumeration("A_ARG_TYPE_Channel", CHANNELS).evented(false))
        .state_variable(
            StateVariableDescriptor::new("Volume", DataType::Ui2)
                .with_range(0, 100, 1)
                .evented(false),
        )
        .state_variable(StateVariableDescriptor::new("LastChange", DataType::String))
        .action(
            ActionDescriptor::new("GetVolume")
                .argument(ArgumentDescriptor::input("InstanceID", "A_ARG_TYPE_InstanceID"))
                .argument(ArgumentDescriptor::input("Channel", "A_ARG_TYPE_Channel"))
                .argument(ArgumentDescriptor::output("CurrentVolume", "Volume").as_retval())
                .error(Fault::new(INVALID_INSTANCE_ID, "Invalid InstanceID")),
        )
        .action(
            ActionDescriptor::new("SetVolume")
                .argument(ArgumentDescriptor::input("InstanceID", "A_ARG_TYPE_InstanceID"))
                .argument(ArgumentDescriptor::input("Channel", "A_ARG_TYPE_Channel"))
                .argument(ArgumentDescriptor::input("DesiredVolume", "Volume"))
                .error(Fault::new(INVALID_INSTANCE_ID, "Invalid InstanceID")),
        )
        .build()
}

/// Volume of each channel of instance 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    volumes: HashMap<String, u16>,
}

impl Renderer {
    /// Every channel at `volume`
    pub fn new(volume: u16) -> Self {
        Self {
            volumes: CHANNELS.iter().map(|c| (c.to_string(), volume)).collect(),
        }
    }

    pub fn volume(&self, channel: &str) -> Option<u16> {
        self.volumes.get(channel).copied()
    }

    /// Channel addressed by an action, or the fault to answer with
    fn channel(action: &ServiceAction) -> Result<String, Fault> {
        if action.get::<u32>("InstanceID")? != 0 {
            return Err(Fault::new(INVALID_INSTANCE_ID, "Invalid InstanceID"));
        }
        let channel = action.get::<String>("Channel")?;
        if !CHANNELS.contains(&channel.as_str()) {
            return Err(Fault::invalid_args());
        }
        Ok(channel)
    }

    fn get_volume(&mut self, action: &mut ServiceAction, _: &Notifier) {
        match Self::channel(action) {
            Ok(channel) => {
                let volume = self.volumes.get(&channel).copied().unwrap_or_default();
                action.set("CurrentVolume", volume).return_success();
            }
            Err(fault) => action.return_fault(fault),
        }
    }

    fn set_volume(&mut self, action: &mut ServiceAction, notifier: &Notifier) {
        let channel = match Self::channel(action) {
            Ok(channel) => channel,
            Err(fault) => return action.return_fault(fault),
        };
        let desired = match action.get::<u16>("DesiredVolume") {
            Ok(volume) if volume <= 100 => volume,
            _ => return action.return_fault(Fault::invalid_args()),
        };

        if self.volumes.insert(channel.clone(), desired) != Some(desired) {
            notifier.notify("LastChange", self.last_change(&channel));
        }
        action.return_success();
    }

    /// Compact LastChange summary of one channel
    fn last_change(&self, channel: &str) -> String {
        format!(
            "InstanceID=0 Volume channel={} val={}",
            channel,
            self.volume(channel).unwrap_or_default()
        )
    }
}

pub fn dispatcher(
    metadata: Arc<ServiceMetadata>,
    notifier: Notifier,
    state: Renderer,
) -> upnp_service::Result<Dispatcher<Renderer>> {
    Dispatcher::new(metadata, notifier, state)
        .on_action("GetVolume", Renderer::get_volume)?
        .on_action("SetVolume", Renderer::set_volume)?
        .on_query("Volume", |renderer: &Renderer| {
            Value::from(renderer.volume("Master").unwrap_or_default())
        })?
        .on_query("LastChange", |renderer: &Renderer| Value::from(renderer.last_change("Master")))
}

/// Register RenderingControl with every channel starting at `volume`
pub fn register(registry: &mut ResourceRegistry, volume: u16) {
    registry.register_resource_type(RENDERING_CONTROL, move |metadata, notifier| {
        let service = dispatcher(metadata, notifier, Renderer::new(volume))?;
        Ok(Box::new(service) as Box<dyn ServiceHandler>)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use upnp_core::{ActionInvocation, ActionResult, ChannelSink};
    use upnp_service::DeviceConfig;

    fn renderer() -> (Dispatcher<Renderer>, tokio::sync::mpsc::UnboundedReceiver<upnp_core::StateChange>) {
        let metadata = Arc::new(metadata().unwrap());
        let (sink, rx) = ChannelSink::new();
        let notifier = Notifier::new(&metadata, Arc::new(sink), &DeviceConfig::default());
        (dispatcher(metadata, notifier, Renderer::new(30)).unwrap(), rx)
    }

    fn get_volume(instance: u32, channel: &str) -> ActionInvocation {
        ActionInvocation::new("GetVolume")
            .argument("InstanceID", instance)
            .argument("Channel", channel)
    }

    #[rstest]
    #[case(0, "Master", Ok(30))]
    #[case(0, "RF", Ok(30))]
    #[case(1, "Master", Err(INVALID_INSTANCE_ID))]
    #[case(0, "Center", Err(Fault::INVALID_ARGS))]
    fn test_get_volume(#[case] instance: u32, #[case] channel: &str, #[case] expected: Result<i64, u16>) {
        let (mut renderer, _rx) = renderer();
        let result = renderer.dispatch(get_volume(instance, channel));
        match expected {
            Ok(volume) => assert_eq!(result.output("CurrentVolume"), Some(&Value::Int(volume))),
            Err(code) => assert_eq!(result.fault().map(|f| f.code), Some(code)),
        }
    }

    #[test]
    fn test_set_volume_notifies_last_change() {
        let (mut renderer, mut rx) = renderer();
        let set = |volume: u16| {
            ActionInvocation::new("SetVolume")
                .argument("InstanceID", 0u32)
                .argument("Channel", "LF")
                .argument("DesiredVolume", volume)
        };

        assert_eq!(renderer.dispatch(set(55)), ActionResult::empty_success());
        assert_eq!(renderer.state().volume("LF"), Some(55));
        let change = rx.try_recv().unwrap();
        assert_eq!(change.variable, "LastChange");
        assert_eq!(change.value, Value::from("InstanceID=0 Volume channel=LF val=55"));

        renderer.dispatch(set(55));
        assert!(rx.try_recv().is_err());

        assert_eq!(
            renderer.dispatch(set(101)),
            ActionResult::Fault(Fault::invalid_args())
        );
    }
}
