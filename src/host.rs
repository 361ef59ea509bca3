//! BridgeHost that coordinates the host side of the plugin bridge

use crate::{BridgeHostBuilder, Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_plugin::{
    BridgeConfig, BridgeLaunch, BridgeMode, ControlEndpoint, ControlMessage, ControlPublisher,
    ControlServer, HostCallback, PluginEventRelay, PluginInstance, PluginRegistry,
    ProcessSupervisor, RelayHandle, SupervisorHandle, SupervisorOutcome, SupervisorState,
};

/// Host side of the bridge: plugin registry, control server, event relay and
/// one supervisor per launched bridge process.
///
/// # Example
///
/// ```ignore
/// use tether::prelude::*;
///
/// let host = BridgeHost::builder().build()?;
/// let slot = host.add_plugin(plugin.clone())?;
///
/// host.launch_bridge(
///     plugin.id(),
///     BridgeMode::FileGui,
///     BridgeLaunch {
///         binary: "/usr/lib/tether/ui-bridge".into(),
///         label: "reverb_stereo".into(),
///         ..Default::default()
///     },
/// )?;
/// ```
pub struct BridgeHost {
    config: BridgeConfig,
    registry: Arc<PluginRegistry>,
    publisher: Arc<dyn ControlPublisher>,
    callback: Arc<dyn HostCallback>,
    server: ControlServer,

    /// Relay runs while this is set
    running: Arc<AtomicBool>,
    relay: RelayHandle,

    /// Live supervisors by plugin id
    supervisors: Mutex<HashMap<i32, SupervisorHandle>>,
}

impl BridgeHost {
    pub fn builder() -> BridgeHostBuilder {
        BridgeHostBuilder::default()
    }

    pub(crate) fn start(
        config: BridgeConfig,
        publisher: Arc<dyn ControlPublisher>,
        callback: Arc<dyn HostCallback>,
    ) -> Result<Self> {
        let registry = Arc::new(PluginRegistry::new(config.max_plugins));

        let server = ControlServer::bind(
            &config,
            Arc::clone(&registry),
            Arc::clone(&publisher),
            Arc::clone(&callback),
        )?;

        let running = Arc::new(AtomicBool::new(true));
        let relay = PluginEventRelay::new(
            Arc::clone(&registry),
            Arc::clone(&publisher),
            Arc::clone(&callback),
        )
        .spawn(Arc::clone(&running), config.relay_interval())?;

        Ok(Self {
            config,
            registry,
            publisher,
            callback,
            server,
            running,
            relay,
            supervisors: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Base URL bridged processes send their traffic to.
    pub fn control_url(&self) -> String {
        self.server.url()
    }

    pub fn control_endpoint(&self) -> &ControlEndpoint {
        self.server.endpoint()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.relay.is_running()
    }

    /// Returns the registry slot the plugin landed in.
    pub fn add_plugin(&self, plugin: Arc<dyn PluginInstance>) -> Result<usize> {
        self.registry
            .add(plugin)
            .ok_or(Error::RegistryFull(self.registry.capacity()))
    }

    /// Remove a plugin, stopping its bridge process first.
    pub fn remove_plugin(&self, plugin_id: i32) -> Option<Arc<dyn PluginInstance>> {
        let supervisor = self.supervisors.lock().remove(&plugin_id);
        drop(supervisor);

        let (slot, _) = self
            .registry
            .occupied()
            .find(|(_, plugin)| plugin.id() == plugin_id)?;
        self.registry.remove(slot)
    }

    fn plugin(&self, plugin_id: i32) -> Result<Arc<dyn PluginInstance>> {
        self.registry
            .find(plugin_id)
            .ok_or(Error::UnknownPlugin(plugin_id))
    }

    /// Spawn a bridge process for `plugin_id` under a new supervisor.
    ///
    /// A process already running for that plugin is stopped first. How the
    /// new one ends is reported through the host callback.
    pub fn launch_bridge(
        &self,
        plugin_id: i32,
        mode: BridgeMode,
        launch: BridgeLaunch,
    ) -> Result<()> {
        let plugin = self.plugin(plugin_id)?;

        let previous = self.supervisors.lock().remove(&plugin_id);
        drop(previous);

        let mut supervisor = ProcessSupervisor::new(
            mode,
            plugin,
            self.server.endpoint().clone(),
            Arc::clone(&self.callback),
            &self.config,
        )
        .with_publisher(Arc::clone(&self.publisher));
        supervisor.configure(
            launch.binary,
            launch.label,
            launch.data1,
            launch.data2,
            launch.data3,
        );

        let handle = supervisor.start()?;
        tracing::debug!("Plugin {}: {:?} launched", plugin_id, mode);
        self.supervisors.lock().insert(plugin_id, handle);
        Ok(())
    }

    pub fn supervisor_state(&self, plugin_id: i32) -> Option<SupervisorState> {
        self.supervisors.lock().get(&plugin_id).map(|s| s.state())
    }

    /// Block until the plugin's bridge process has been dealt with.
    /// None if nothing was launched or it did not finish within `timeout`.
    pub fn wait_bridge(&self, plugin_id: i32, timeout: Duration) -> Option<SupervisorOutcome> {
        let outcome = self
            .supervisors
            .lock()
            .get(&plugin_id)
            .map(|s| s.outcome().clone())?;
        outcome.recv_timeout(timeout).ok()
    }

    /// Ask the plugin's UI to show or hide itself. False if no UI is attached.
    pub fn set_gui_visible(&self, plugin_id: i32, visible: bool) -> Result<bool> {
        let message = if visible {
            ControlMessage::Show
        } else {
            ControlMessage::Hide
        };
        self.send_to_ui(plugin_id, message)
    }

    /// Ask the plugin's UI to quit. Its supervisor reports the exit.
    pub fn close_gui(&self, plugin_id: i32) -> Result<bool> {
        self.send_to_ui(plugin_id, ControlMessage::Quit)
    }

    fn send_to_ui(&self, plugin_id: i32, message: ControlMessage) -> Result<bool> {
        let plugin = self.plugin(plugin_id)?;
        Ok(match plugin.remote_ui().endpoint() {
            Some(ui) => self.publisher.publish(&ui, message),
            None => false,
        })
    }

    /// Stop the relay, every bridge process and the control server.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        self.relay.stop();

        let supervisors: Vec<_> = self.supervisors.lock().drain().collect();
        drop(supervisors);

        self.server.shutdown();
    }
}

impl Drop for BridgeHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}
