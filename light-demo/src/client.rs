//! The volume-querying control point flow
//!
//! For every RenderingControl proxy that becomes available: introspect it,
//! pick the first allowed `Channel`, call `GetVolume` on instance 0 and
//! collect the OUT arguments.

use serde::Serialize;
use tokio::sync::mpsc;
use upnp_core::{LoopHandle, Value};
use upnp_proxy::ServiceProxy;

use crate::error::{DemoError, Result};

/// OUT arguments of one `GetVolume` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeReading {
    pub udn: String,
    pub channel: String,
    pub outputs: Vec<(String, Value)>,
}

impl VolumeReading {
    pub fn volume(&self) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|(name, _)| name == "CurrentVolume")
            .map(|(_, value)| value)
    }
}

pub async fn query_volume(proxy: &ServiceProxy) -> Result<VolumeReading> {
    proxy.introspect().await?;

    let invoker = proxy.action("GetVolume")?;
    let channel = invoker
        .allowed_values("Channel")?
        .first()
        .cloned()
        .ok_or_else(|| DemoError::NoAllowedValues {
            action: "GetVolume".to_string(),
            argument: "Channel".to_string(),
        })?;

    tracing::debug!(proxy = %proxy.id(), channel = %channel, "Querying volume");
    let outputs = invoker
        .argument("InstanceID", 0u32)
        .argument("Channel", channel.as_str())
        .invoke()
        .await?
        .collect();

    Ok(VolumeReading {
        udn: proxy.info().udn.clone(),
        channel,
        outputs,
    })
}

/// Query every proxy received on `proxies` concurrently on tasks owned by
/// `handle`, forwarding each reading, until the proxy channel closes or the
/// loop stops
///
/// Failed queries are logged and skipped.
pub async fn query_renderers(
    handle: LoopHandle,
    mut proxies: mpsc::Receiver<ServiceProxy>,
    readings: mpsc::UnboundedSender<VolumeReading>,
) {
    while let Some(proxy) = proxies.recv().await {
        tracing::info!(proxy = %proxy.id(), "Renderer available");
        let readings = readings.clone();
        let spawned = handle.spawn(async move {
            match query_volume(&proxy).await {
                Ok(reading) => {
                    let _ = readings.send(reading);
                }
                Err(e) => tracing::warn!(proxy = %proxy.id(), error = %e, "Volume query failed"),
            }
        });
        if !spawned {
            tracing::debug!("Main loop stopped, no further renderers are queried");
            break;
        }
    }
}
