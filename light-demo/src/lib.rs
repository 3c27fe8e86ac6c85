//! Illustrative programs for the UPnP dispatch workspace
//!
//! A BinaryLight serving SwitchPower, MediaRenderers serving
//! RenderingControl, and control points that switch the light and query
//! renderer volumes, all talking over the in-process loopback transport.

pub mod client;
pub mod devices;
pub mod error;
pub mod light_client;
pub mod rendering_control;
pub mod switch_power;

pub use client::{query_renderers, query_volume, VolumeReading};
pub use error::{DemoError, Result};
pub use light_client::{drive_first_light, switch, LightCommand};
