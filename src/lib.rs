//! # Tether - Out-of-process Plugin Bridge
//!
//! Runs a plugin's UI, or its whole processing, in a separate process and
//! keeps both sides in sync over a UDP control protocol.
//!
//! ## Architecture
//!
//! Tether is an umbrella crate that coordinates:
//! - **tether-plugin** - Host side (event relay, control server, process supervision)
//! - **tether-plugin-ui** - UI process side (inbound queue, UI session, `ui-bridge` binary)
//!
//! ## Quick Start
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let (callback, events) = ChannelCallback::bounded(1024);
//! let host = BridgeHost::builder()
//!     .callback(Arc::new(callback))
//!     .build()?;
//!
//! let synth = Arc::new(BridgedPlugin::builder(0, "Synth").build());
//! host.add_plugin(synth.clone())?;
//! host.launch_bridge(
//!     0,
//!     BridgeMode::FileGui,
//!     BridgeLaunch {
//!         binary: "ui-bridge".into(),
//!         label: "synth".into(),
//!         ..Default::default()
//!     },
//! )?;
//!
//! // Parameter changes made on the host reach the UI on the next relay cycle
//! synth.change_parameter(0, 0.5);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Host side plus the UI process crate
//! - `ui` - Re-export `tether-plugin-ui`

/// Re-export of tether-plugin for direct access
pub use tether_plugin as plugin;

pub use tether_plugin::{
    BridgeConfig, BridgeError, BridgeLaunch, BridgeMode, BridgedPlugin, CallbackAction,
    CallbackEvent, ChannelCallback, ControlEndpoint, ControlMessage, ControlPublisher,
    HostCallback, PluginInstance, PostEventKind, SupervisorOutcome, SupervisorState,
};

// UI process side
#[cfg(feature = "ui")]
pub use tether_plugin_ui as ui;

#[cfg(feature = "ui")]
pub use tether_plugin_ui::{ControlQueue, HostLink, PluginUi, UiSession, UiWindow};

mod builder;
mod error;
mod host;

pub use builder::BridgeHostBuilder;
pub use error::{Error, Result};
pub use host::BridgeHost;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{BridgeHost, BridgeHostBuilder};

    pub use crate::plugin::{
        BridgeLaunch, BridgeMode, BridgedPlugin, CallbackAction, ChannelCallback, HostCallback,
        PluginInstance, PostEventKind,
    };

    #[cfg(feature = "ui")]
    pub use crate::ui::{PluginUi, UiSession, UiWindow};

    pub use std::sync::Arc;
}
