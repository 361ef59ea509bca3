//! Out-of-process plugin bridging for Tether
//!
//! Host side of the bridge: a plugin's UI or its whole processing can run in a
//! separate process, kept in sync with the host over a UDP control protocol.
//! The UI-process side lives in `tether-plugin-ui`.
//!
//! ## Pieces
//!
//! - [`PluginEventRelay`]: one background thread that drains every plugin's
//!   post-events and republishes them to remote UIs and the host callback sink
//! - [`ProcessSupervisor`]: spawns one bridge process and reports how it ended
//! - [`ControlServer`]: receives traffic coming back from bridged processes
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use tether_plugin::*;
//!
//! let config = BridgeConfig::default();
//! let registry = Arc::new(PluginRegistry::new(config.max_plugins));
//! let publisher: Arc<dyn ControlPublisher> = Arc::new(UdpPublisher::new()?);
//! let (callback, events) = ChannelCallback::bounded(1024);
//! let callback: Arc<dyn HostCallback> = Arc::new(callback);
//!
//! let server = ControlServer::bind(&config, registry.clone(), publisher.clone(), callback.clone())?;
//! let running = Arc::new(AtomicBool::new(true));
//! let _relay = PluginEventRelay::new(registry.clone(), publisher, callback.clone())
//!     .spawn(running, config.relay_interval())?;
//!
//! let mut supervisor = ProcessSupervisor::new(
//!     BridgeMode::FileGui,
//!     plugin,
//!     server.endpoint().clone(),
//!     callback,
//!     &config,
//! );
//! supervisor.configure("/usr/bin/ui-bridge", "label", "", "", "");
//! let handle = supervisor.start()?;
//! ```

pub mod error;
pub use error::{BridgeError, BridgeStage, Result};

pub mod protocol;
pub use protocol::{BridgeConfig, ControlEndpoint, ControlMessage, ControlPacket};

mod callback;
pub use callback::{
    CallbackAction, CallbackEvent, ChannelCallback, HostCallback, NullCallback, GUI_CRASHED,
};

mod post_event;
pub use post_event::{PostEvent, PostEventBuffer, PostEventKind, PostEventVec, MAX_POST_EVENTS};

mod remote;
pub use remote::RemoteLink;

mod instance;
pub use instance::{
    MidiProgram, ParameterData, ParameterHints, ParameterKind, PluginFormat, PluginInstance,
    PluginPeaks,
};

mod plugin;
pub use plugin::{BridgedPlugin, BridgedPluginBuilder};

mod registry;
pub use registry::{PluginRegistry, MAX_PLUGINS};

pub mod transport;

mod publisher;
pub use publisher::{ControlPublisher, UdpPublisher};

mod relay;
pub use relay::{PluginEventRelay, RelayHandle, RELAY_INTERVAL};

mod process;
pub use process::{BridgeProcessHandle, ProcessBackend, SystemProcessBackend, SIGNALED_EXIT_CODE};

mod supervisor;
pub use supervisor::{
    BridgeLaunch, BridgeMode, ProcessSupervisor, SupervisorHandle, SupervisorOutcome,
    SupervisorState,
};

mod library;
pub use library::PluginLibrary;

mod server;
pub use server::{ControlDispatcher, ControlServer};
