//! Process Supervisor.
//!
//! One supervisor per bridged subprocess. It builds the argument vector for
//! its [`BridgeMode`], launches the process, waits for the OS to confirm the
//! start and then for the process to go away, and reports how it ended through
//! the host callback sink. Nothing is returned to the caller as an error: the
//! [`SupervisorOutcome`] is delivered on a channel for whoever wants it.
//!
//! ```text
//! Created → ArgsBuilt → Started → (Confirming | WaitingExit) → {ClosedClean, Crashed}
//! ```

use crate::callback::{CallbackAction, HostCallback, GUI_CRASHED};
use crate::error::{BridgeError, BridgeStage, Result};
use crate::instance::PluginInstance;
use crate::process::{BridgeProcessHandle, ProcessBackend, SystemProcessBackend};
use crate::protocol::{BridgeConfig, ControlEndpoint, ControlMessage};
use crate::publisher::ControlPublisher;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What kind of process is being supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    /// UI that loads the plugin file itself.
    /// Args: `[url, plugin path, label, "<name> (GUI)"]`
    FileGui,
    /// UI described by label and three opaque data fields.
    /// Args: `[url, label, data1, data2, data3, "<name> (GUI)"]`
    DataGui,
    /// Plugin processing runs in the subprocess.
    /// Args: `[url, data1, plugin path, label]`
    FullBridge,
}

impl BridgeMode {
    pub fn is_gui(self) -> bool {
        matches!(self, BridgeMode::FileGui | BridgeMode::DataGui)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Created,
    ArgsBuilt,
    Started,
    /// Waiting for the GUI to announce itself.
    Confirming,
    WaitingExit,
    ClosedClean,
    Crashed,
}

impl SupervisorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SupervisorState::ClosedClean | SupervisorState::Crashed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorOutcome {
    GuiClosed,
    GuiCrashed { exit_code: i32 },
    /// The GUI never confirmed it was up; the process was stopped.
    GuiTimeout,
    BridgeClosed,
    BridgeCrashed { exit_code: i32 },
    StartFailed,
    /// The child was reclaimed by its owner before it exited on its own.
    Terminated,
}

/// Launch parameters set by [`ProcessSupervisor::configure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeLaunch {
    pub binary: PathBuf,
    pub label: String,
    pub data1: String,
    pub data2: String,
    pub data3: String,
}

type SharedChild = Arc<Mutex<Option<Box<dyn BridgeProcessHandle>>>>;

enum ChildPoll {
    Running,
    Exited(i32),
    /// Taken away by the owner.
    Gone,
}

pub struct ProcessSupervisor {
    mode: BridgeMode,
    plugin: Arc<dyn PluginInstance>,
    control_endpoint: ControlEndpoint,
    launch: BridgeLaunch,
    callback: Arc<dyn HostCallback>,
    publisher: Option<Arc<dyn ControlPublisher>>,
    backend: Arc<dyn ProcessBackend>,
    start_timeout: Duration,
    gui_timeout: Duration,
    exit_poll_interval: Duration,
    state: Arc<Mutex<SupervisorState>>,
    child: SharedChild,
}

impl ProcessSupervisor {
    /// `control_endpoint` is the host's base endpoint; the plugin id is appended.
    pub fn new(
        mode: BridgeMode,
        plugin: Arc<dyn PluginInstance>,
        control_endpoint: ControlEndpoint,
        callback: Arc<dyn HostCallback>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            mode,
            plugin,
            control_endpoint,
            launch: BridgeLaunch::default(),
            callback,
            publisher: None,
            backend: Arc::new(SystemProcessBackend),
            start_timeout: config.start_timeout(),
            gui_timeout: config.gui_timeout(),
            exit_poll_interval: config.exit_poll_interval(),
            state: Arc::new(Mutex::new(SupervisorState::Created)),
            child: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ProcessBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Used to tell a confirmed GUI to show itself.
    pub fn with_publisher(mut self, publisher: Arc<dyn ControlPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Store launch parameters. Nothing happens until the supervisor runs.
    pub fn configure(
        &mut self,
        binary: impl Into<PathBuf>,
        label: impl Into<String>,
        data1: impl Into<String>,
        data2: impl Into<String>,
        data3: impl Into<String>,
    ) {
        self.launch = BridgeLaunch {
            binary: binary.into(),
            label: label.into(),
            data1: data1.into(),
            data2: data2.into(),
            data3: data3.into(),
        };
    }

    pub fn mode(&self) -> BridgeMode {
        self.mode
    }

    pub fn launch(&self) -> &BridgeLaunch {
        &self.launch
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.lock()
    }

    fn set_state(&self, state: SupervisorState) {
        *self.state.lock() = state;
    }

    /// Argument vector for the subprocess.
    pub fn build_args(&self) -> Vec<String> {
        let url = self
            .control_endpoint
            .with_plugin_id(self.plugin.id())
            .url();
        let plugin_path = self.plugin.filename().display().to_string();
        let gui_title = format!("{} (GUI)", self.plugin.name());
        let launch = &self.launch;

        match self.mode {
            BridgeMode::FileGui => vec![url, plugin_path, launch.label.clone(), gui_title],
            BridgeMode::DataGui => vec![
                url,
                launch.label.clone(),
                launch.data1.clone(),
                launch.data2.clone(),
                launch.data3.clone(),
                gui_title,
            ],
            BridgeMode::FullBridge => {
                vec![url, launch.data1.clone(), plugin_path, launch.label.clone()]
            }
        }
    }

    /// Run the whole lifecycle on the calling thread.
    pub fn run(&self) -> SupervisorOutcome {
        let args = self.build_args();
        self.set_state(SupervisorState::ArgsBuilt);

        if self.mode.is_gui() {
            // A link left over from an earlier session would confirm immediately
            self.plugin.remote_ui().detach();
        }

        let capture_output = self.mode == BridgeMode::FullBridge;
        let process = match self
            .backend
            .spawn(&self.launch.binary, &args, capture_output)
        {
            Ok(process) => process,
            Err(e) => {
                tracing::warn!("Plugin {}: {}", self.plugin.id(), e);
                return self.start_failed();
            }
        };
        *self.child.lock() = Some(process);

        let start_timeout = self.start_timeout;
        let started = self
            .with_child(|child| child.wait_for_start(start_timeout))
            .unwrap_or(false);
        if !started {
            let error = BridgeError::SpawnFailed {
                binary: self.launch.binary.clone(),
                stage: BridgeStage::Starting,
                reason: "process did not start".to_string(),
            };
            tracing::warn!("Plugin {}: {}", self.plugin.id(), error);
            self.reclaim_child();
            return self.start_failed();
        }

        tracing::debug!(
            "Plugin {}: {:?} started ({:?})",
            self.plugin.id(),
            self.mode,
            self.launch.binary
        );
        self.set_state(SupervisorState::Started);

        if self.mode.is_gui() {
            self.supervise_gui()
        } else {
            self.supervise_bridge()
        }
    }

    /// Run on a dedicated `bridge-supervisor` thread.
    pub fn start(self) -> Result<SupervisorHandle> {
        let state = Arc::clone(&self.state);
        let child = Arc::clone(&self.child);
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::Builder::new()
            .name("bridge-supervisor".to_string())
            .spawn(move || self.run_to_channel(outcome_tx))?;

        Ok(SupervisorHandle {
            state,
            child,
            outcome: outcome_rx,
            thread_handle: Some(thread_handle),
        })
    }

    fn run_to_channel(self, outcome_tx: Sender<SupervisorOutcome>) {
        let outcome = self.run();
        let _ = outcome_tx.send(outcome);
    }

    fn supervise_gui(&self) -> SupervisorOutcome {
        self.set_state(SupervisorState::Confirming);

        let deadline = Instant::now() + self.gui_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if self
                .plugin
                .remote_ui()
                .wait_attached(remaining.min(self.exit_poll_interval))
            {
                break;
            }

            match self.poll_child() {
                ChildPoll::Running => {}
                ChildPoll::Exited(exit_code) => return self.gui_exited(exit_code),
                ChildPoll::Gone => return self.terminated(),
            }

            if remaining.is_zero() {
                let error = BridgeError::Timeout {
                    operation: format!("GUI confirmation for plugin {}", self.plugin.id()),
                    duration_ms: self.gui_timeout.as_millis() as u64,
                };
                tracing::debug!("{}, GUI did not respond", error);
                self.reclaim_child();
                self.notify(CallbackAction::ShowGui, 0);
                self.set_state(SupervisorState::ClosedClean);
                return SupervisorOutcome::GuiTimeout;
            }
        }

        tracing::debug!("Plugin {}: GUI confirmed", self.plugin.id());
        if let (Some(publisher), Some(ui)) = (&self.publisher, self.plugin.remote_ui().endpoint()) {
            publisher.publish(&ui, ControlMessage::Show);
        }
        self.notify(CallbackAction::ShowGui, 1);

        match self.wait_for_exit() {
            Some(exit_code) => self.gui_exited(exit_code),
            None => self.terminated(),
        }
    }

    fn gui_exited(&self, exit_code: i32) -> SupervisorOutcome {
        self.plugin.remote_ui().detach();

        if exit_code == 0 {
            tracing::debug!("Plugin {}: GUI closed", self.plugin.id());
            self.notify(CallbackAction::ShowGui, 0);
            self.set_state(SupervisorState::ClosedClean);
            SupervisorOutcome::GuiClosed
        } else {
            tracing::warn!(
                "Plugin {}: GUI crashed with exit code {}",
                self.plugin.id(),
                exit_code
            );
            self.notify(CallbackAction::ShowGui, GUI_CRASHED);
            self.set_state(SupervisorState::Crashed);
            SupervisorOutcome::GuiCrashed { exit_code }
        }
    }

    fn supervise_bridge(&self) -> SupervisorOutcome {
        let Some(exit_code) = self.wait_for_exit() else {
            return self.terminated();
        };

        let output = self
            .with_child(|child| child.read_captured_output())
            .unwrap_or_default();

        if exit_code == 0 {
            tracing::debug!(
                "Plugin {}: bridge closed\n{}",
                self.plugin.id(),
                String::from_utf8_lossy(&output)
            );
            self.notify(CallbackAction::BridgeClosed, 0);
            self.set_state(SupervisorState::ClosedClean);
            return SupervisorOutcome::BridgeClosed;
        }

        tracing::warn!(
            "Plugin {}: bridge crashed with exit code {}\n{}",
            self.plugin.id(),
            exit_code,
            String::from_utf8_lossy(&output)
        );
        self.notify(CallbackAction::BridgeCrashed, exit_code);
        self.set_state(SupervisorState::Crashed);
        SupervisorOutcome::BridgeCrashed { exit_code }
    }

    /// Block until the child exits. `None` if the owner took it away first.
    fn wait_for_exit(&self) -> Option<i32> {
        self.set_state(SupervisorState::WaitingExit);
        loop {
            match self.poll_child() {
                ChildPoll::Running => thread::sleep(self.exit_poll_interval),
                ChildPoll::Exited(exit_code) => return Some(exit_code),
                ChildPoll::Gone => return None,
            }
        }
    }

    // Polls without holding the lock across the sleep, so the owner can
    // reclaim the child at any time.
    fn poll_child(&self) -> ChildPoll {
        let mut guard = self.child.lock();
        match guard.as_mut() {
            None => ChildPoll::Gone,
            Some(child) => match child.wait_for_exit(Some(Duration::ZERO)) {
                Some(exit_code) => ChildPoll::Exited(exit_code),
                None => ChildPoll::Running,
            },
        }
    }

    fn with_child<R>(&self, f: impl FnOnce(&mut dyn BridgeProcessHandle) -> R) -> Option<R> {
        self.child.lock().as_mut().map(|child| f(child.as_mut()))
    }

    fn reclaim_child(&self) {
        if let Some(mut child) = self.child.lock().take() {
            child.kill();
        }
    }

    fn start_failed(&self) -> SupervisorOutcome {
        if self.mode.is_gui() {
            self.notify(CallbackAction::ShowGui, 0);
        } else {
            self.notify(CallbackAction::BridgeCrashed, -1);
        }
        self.set_state(SupervisorState::Crashed);
        SupervisorOutcome::StartFailed
    }

    fn terminated(&self) -> SupervisorOutcome {
        tracing::debug!("Plugin {}: bridge process reclaimed", self.plugin.id());
        if self.mode.is_gui() {
            self.plugin.remote_ui().detach();
        }
        self.set_state(SupervisorState::ClosedClean);
        SupervisorOutcome::Terminated
    }

    fn notify(&self, action: CallbackAction, value1: i32) {
        self.callback
            .notify(action, self.plugin.id(), value1, 0, 0.0);
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.reclaim_child();
    }
}

/// Owner side of a running supervisor.
///
/// Dropping it kills a still-running child and joins the supervisor thread.
pub struct SupervisorHandle {
    state: Arc<Mutex<SupervisorState>>,
    child: SharedChild,
    outcome: Receiver<SupervisorOutcome>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SupervisorHandle {
    pub fn state(&self) -> SupervisorState {
        *self.state.lock()
    }

    /// Receives exactly one outcome once the supervisor is done.
    pub fn outcome(&self) -> &Receiver<SupervisorOutcome> {
        &self.outcome
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child.lock().as_ref().and_then(|child| child.id())
    }

    pub fn is_finished(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Kill the child if it is still running and wait for the supervisor.
    pub fn terminate(&mut self) {
        if let Some(mut child) = self.child.lock().take() {
            child.kill();
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}
