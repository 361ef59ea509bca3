//! Host control server.
//!
//! Receives control traffic from bridged processes on the host's base
//! endpoint. Paths below the base (`<base>/<plugin id>`) address one plugin;
//! the base path itself carries meter listener registration.

use crate::callback::{CallbackAction, HostCallback};
use crate::error::{BridgeError, Result};
use crate::instance::PluginInstance;
use crate::protocol::{
    BridgeConfig, ControlEndpoint, ControlMessage, ControlPacket, MIDI_STATUS_NOTE_OFF,
    MIDI_STATUS_NOTE_ON,
};
use crate::publisher::ControlPublisher;
use crate::registry::PluginRegistry;
use crate::relay::midi_program_messages;
use crate::transport::{self, ControlSocket, RECV_POLL_INTERVAL};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Applies incoming packets to the registry and reports them to the host.
pub struct ControlDispatcher {
    base: ControlEndpoint,
    registry: Arc<PluginRegistry>,
    publisher: Arc<dyn ControlPublisher>,
    callback: Arc<dyn HostCallback>,
}

impl ControlDispatcher {
    pub fn new(
        base: ControlEndpoint,
        registry: Arc<PluginRegistry>,
        publisher: Arc<dyn ControlPublisher>,
        callback: Arc<dyn HostCallback>,
    ) -> Self {
        Self {
            base,
            registry,
            publisher,
            callback,
        }
    }

    pub fn handle_packet(&self, packet: ControlPacket) {
        if packet.path == self.base.path() {
            self.handle_global(packet.message);
            return;
        }

        let Some(plugin_id) = self.base.plugin_id_of(&packet.path) else {
            tracing::debug!("Ignoring packet for unknown path {}", packet.path);
            return;
        };
        let Some(plugin) = self.registry.find(plugin_id) else {
            tracing::debug!("Ignoring packet for missing plugin {}", plugin_id);
            return;
        };

        self.handle_plugin(plugin.as_ref(), packet.message);
    }

    fn handle_global(&self, message: ControlMessage) {
        match message {
            ControlMessage::Register { url } => match ControlEndpoint::parse(&url) {
                Ok(endpoint) => {
                    tracing::debug!("Meter listener registered at {}", endpoint);
                    self.registry.meter_listener().attach(endpoint);
                }
                Err(e) => tracing::debug!("Rejecting meter listener: {}", e),
            },
            ControlMessage::Unregister => {
                if self.registry.meter_listener().detach().is_some() {
                    tracing::debug!("Meter listener unregistered");
                }
            }
            other => tracing::debug!("Ignoring {:?} on base path", other),
        }
    }

    fn handle_plugin(&self, plugin: &dyn PluginInstance, message: ControlMessage) {
        let id = plugin.id();

        match message {
            ControlMessage::Update { url } => match ControlEndpoint::parse(&url) {
                Ok(endpoint) => {
                    tracing::debug!("Plugin {}: UI listening at {}", id, endpoint);
                    self.send_state(plugin, &endpoint);
                    plugin.remote_ui().attach(endpoint);
                }
                Err(e) => tracing::debug!("Plugin {}: bad UI url: {}", id, e),
            },

            ControlMessage::Exiting => {
                tracing::debug!("Plugin {}: UI exiting", id);
                plugin.remote_ui().detach();
                self.callback.notify(CallbackAction::ShowGui, id, 0, 0, 0.0);
            }

            ControlMessage::Control { index, value } => {
                let Some(slot) = usize::try_from(index)
                    .ok()
                    .filter(|&slot| slot < plugin.parameter_count())
                else {
                    tracing::debug!("Plugin {}: no parameter {}", id, index);
                    return;
                };
                plugin.set_parameter_value(slot, value as f64);
                self.callback.notify(
                    CallbackAction::ParameterChanged,
                    id,
                    index,
                    0,
                    plugin.parameter_value(slot),
                );
            }

            ControlMessage::Program { index } => {
                if index < 0 || index as usize >= plugin.program_count() {
                    tracing::debug!("Plugin {}: no program {}", id, index);
                    return;
                }
                plugin.set_current_program(index);
                self.callback
                    .notify(CallbackAction::ProgramChanged, id, index, 0, 0.0);
            }

            ControlMessage::MidiProgram { bank, program } => {
                let found = (0..plugin.midi_program_count()).find(|&index| {
                    plugin.midi_program(index).is_some_and(|mp| {
                        mp.bank as i32 == bank && mp.program as i32 == program
                    })
                });
                match found {
                    Some(index) => {
                        plugin.set_current_midi_program(index as i32);
                        self.callback.notify(
                            CallbackAction::MidiProgramChanged,
                            id,
                            index as i32,
                            0,
                            0.0,
                        );
                    }
                    None => tracing::debug!(
                        "Plugin {}: no MIDI program {}:{}",
                        id,
                        bank,
                        program
                    ),
                }
            }

            ControlMessage::Midi { data } => {
                let [_, status, note, velocity] = data;
                match status & 0xF0 {
                    MIDI_STATUS_NOTE_ON if velocity > 0 => self.callback.notify(
                        CallbackAction::NoteOn,
                        id,
                        note as i32,
                        velocity as i32,
                        0.0,
                    ),
                    MIDI_STATUS_NOTE_ON | MIDI_STATUS_NOTE_OFF => {
                        self.callback
                            .notify(CallbackAction::NoteOff, id, note as i32, 0, 0.0)
                    }
                    _ => tracing::trace!("Plugin {}: ignoring MIDI status {:#04x}", id, status),
                }
            }

            ControlMessage::Resize { width, height } => {
                self.callback
                    .notify(CallbackAction::ResizeGui, id, width, height, 0.0);
            }

            other => tracing::debug!("Plugin {}: ignoring {:?}", id, other),
        }
    }

    /// Bring a freshly announced UI up to date with the host's state.
    fn send_state(&self, plugin: &dyn PluginInstance, ui: &ControlEndpoint) {
        for index in 0..plugin.parameter_count() {
            self.publisher.publish(
                ui,
                ControlMessage::Control {
                    index: index as i32,
                    value: plugin.parameter_value(index) as f32,
                },
            );
        }

        let program = plugin.current_program();
        if program >= 0 {
            self.publisher
                .publish(ui, ControlMessage::Program { index: program });
        }

        let midi_program = usize::try_from(plugin.current_midi_program())
            .ok()
            .and_then(|index| plugin.midi_program(index));
        if let Some(midi_program) = midi_program {
            for message in midi_program_messages(plugin.format(), midi_program) {
                self.publisher.publish(ui, message);
            }
        }
    }
}

/// UDP server thread feeding a [`ControlDispatcher`]. Stops when dropped.
pub struct ControlServer {
    endpoint: ControlEndpoint,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl ControlServer {
    pub fn bind(
        config: &BridgeConfig,
        registry: Arc<PluginRegistry>,
        publisher: Arc<dyn ControlPublisher>,
        callback: Arc<dyn HostCallback>,
    ) -> Result<Self> {
        let socket = transport::bind_std(config.control_bind)?;
        let endpoint = ControlEndpoint::new(socket.local_addr()?, config.control_path.as_str());
        let dispatcher = ControlDispatcher::new(endpoint.clone(), registry, publisher, callback);
        let running = Arc::new(AtomicBool::new(true));

        let thread_handle = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("control-server".to_string())
                .spawn(move || Self::server_thread_main(socket, dispatcher, running))?
        };

        tracing::info!("Control server listening at {}", endpoint);

        Ok(Self {
            endpoint,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    fn server_thread_main(
        socket: std::net::UdpSocket,
        dispatcher: ControlDispatcher,
        running: Arc<AtomicBool>,
    ) {
        let runtime = match transport::socket_runtime() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Control server runtime failed: {}", e);
                return;
            }
        };

        runtime.block_on(async {
            let mut socket = match ControlSocket::from_std(socket) {
                Ok(socket) => socket,
                Err(e) => {
                    tracing::error!("Control server socket failed: {}", e);
                    return;
                }
            };

            while running.load(Ordering::Acquire) {
                match socket.recv_packet_timeout(RECV_POLL_INTERVAL).await {
                    Ok(Some((packet, _from))) => dispatcher.handle_packet(packet),
                    Ok(None) => {}
                    Err(BridgeError::Serialization(e)) => {
                        tracing::debug!("Dropping malformed packet: {}", e);
                    }
                    Err(e) => tracing::debug!("Control server receive failed: {}", e),
                }
            }
        });
    }

    /// Base endpoint; plugin endpoints are below it.
    pub fn endpoint(&self) -> &ControlEndpoint {
        &self.endpoint
    }

    pub fn url(&self) -> String {
        self.endpoint.url()
    }

    pub fn plugin_endpoint(&self, plugin_id: i32) -> ControlEndpoint {
        self.endpoint.with_plugin_id(plugin_id)
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
