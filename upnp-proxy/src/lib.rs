//! Client-side UPnP action invocation
//!
//! A [`ControlPoint`] turns discovery announcements into [`ServiceProxy`]
//! handles. A proxy introspects its service once, caches the metadata, and
//! validates every invocation against it before submitting it through the
//! [`Transport`](upnp_core::Transport).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use upnp_proxy::{ControlPoint, ProxyConfig};
//!
//! let (control_point, mut proxies) =
//!     ControlPoint::new("urn:schemas-upnp-org:service:RenderingControl:1", transport, ProxyConfig::default())?;
//! tokio::spawn(control_point.run(announcements));
//!
//! while let Some(proxy) = proxies.recv().await {
//!     proxy.introspect().await?;
//!     let invoker = proxy.action("GetVolume")?;
//!     let channel = invoker.allowed_values("Channel")?[0].clone();
//!     let outputs = invoker
//!         .argument("InstanceID", 0u32)
//!         .argument("Channel", channel)
//!         .invoke()
//!         .await?;
//!     for (name, value) in outputs {
//!         println!("{name} = {value}");
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod control_point;
pub mod error;
pub mod invoker;
pub mod proxy;

pub use cache::IntrospectionCache;
pub use config::ProxyConfig;
pub use control_point::{proxy_stream, ControlPoint};
pub use error::{ProxyError, Result};
pub use invoker::{ActionInvoker, OutputIter};
pub use proxy::{ProxyState, ServiceProxy};
