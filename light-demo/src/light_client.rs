//! Switching a discovered light on, off or over through its SwitchPower proxy

use std::time::Duration;

use clap::ValueEnum;
use tokio::sync::mpsc;
use upnp_core::Value;
use upnp_proxy::ServiceProxy;

use crate::error::{DemoError, Result};
use crate::switch_power::SWITCH_POWER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LightCommand {
    On,
    Off,
    /// Read the status and set the opposite
    Toggle,
}

/// Apply `command` to one light, returning the target it was set to
pub async fn switch(proxy: &ServiceProxy, command: LightCommand) -> Result<bool> {
    if proxy.metadata().is_none() {
        proxy.introspect().await?;
    }

    let target = match command {
        LightCommand::On => true,
        LightCommand::Off => false,
        LightCommand::Toggle => {
            let status = proxy
                .action("GetStatus")?
                .invoke()
                .await?
                .find_value("ResultStatus");
            match status {
                Some(Value::Bool(on)) => !on,
                _ => {
                    return Err(DemoError::MissingOutput {
                        action: "GetStatus".to_string(),
                        argument: "ResultStatus".to_string(),
                    })
                }
            }
        }
    };

    proxy
        .action("SetTarget")?
        .argument("newTargetValue", target)
        .invoke()
        .await?;
    tracing::debug!(proxy = %proxy.id(), target, "Switch set");
    Ok(target)
}

/// Wait for the first light to become available and apply `command` to it
/// `repeat` times, `delay` apart
///
/// Stops at the first failing command.
pub async fn drive_first_light(
    mut proxies: mpsc::Receiver<ServiceProxy>,
    command: LightCommand,
    repeat: u32,
    delay: Duration,
) -> Result<Vec<bool>> {
    let proxy = proxies
        .recv()
        .await
        .ok_or_else(|| DemoError::NoService(SWITCH_POWER.to_string()))?;
    tracing::info!(proxy = %proxy.id(), ?command, repeat, "Light found");

    let mut targets = Vec::with_capacity(repeat as usize);
    for round in 0..repeat {
        if round > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        targets.push(switch(&proxy, command).await?);
    }
    Ok(targets)
}
