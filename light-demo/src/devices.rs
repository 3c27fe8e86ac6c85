//! The two root devices the demo hosts

use std::sync::Arc;

use upnp_core::EventSink;
use upnp_service::{DeviceConfig, DeviceDescription, ResourceRegistry, RootDevice};

use crate::error::Result;
use crate::{rendering_control, switch_power};

/// Registry knowing both demo service types
pub fn registry(initial_volume: u16) -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    switch_power::register(&mut registry);
    rendering_control::register(&mut registry, initial_volume);
    registry
}

/// A BinaryLight hosting SwitchPower, switched off
pub fn binary_light(
    registry: &ResourceRegistry,
    sink: Arc<dyn EventSink>,
    config: DeviceConfig,
) -> Result<RootDevice> {
    let description = DeviceDescription::new("BinaryLight1.xml", switch_power::BINARY_LIGHT)
        .with_friendly_name("Demo light")
        .with_service(switch_power::metadata()?);
    Ok(RootDevice::new(description, registry, sink, config)?)
}

/// A MediaRenderer hosting RenderingControl
pub fn media_renderer(
    udn: &str,
    registry: &ResourceRegistry,
    sink: Arc<dyn EventSink>,
    config: DeviceConfig,
) -> Result<RootDevice> {
    let description = DeviceDescription::new("MediaRenderer1.xml", rendering_control::MEDIA_RENDERER)
        .with_udn(udn)
        .with_friendly_name(format!("Demo renderer {}", udn.trim_start_matches("uuid:")))
        .with_service(rendering_control::metadata()?);
    Ok(RootDevice::new(description, registry, sink, config)?)
}
