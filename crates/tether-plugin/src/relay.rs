//! Plugin Event Relay.
//!
//! A single background thread that, once per cycle, drains every plugin's
//! post-events and republishes them to attached remote UIs and to the host
//! callback sink. It also republishes automatable output parameters and, when
//! a meter listener is attached, peak levels.
//!
//! The relay runs while the engine's running flag is set; it checks the flag
//! once per cycle and sleeps between cycles, so stopping takes at most one
//! interval.

use crate::callback::{CallbackAction, HostCallback};
use crate::error::Result;
use crate::instance::{MidiProgram, PluginFormat, PluginInstance};
use crate::post_event::{PostEvent, PostEventKind};
use crate::protocol::{ControlEndpoint, ControlMessage};
use crate::publisher::ControlPublisher;
use crate::registry::PluginRegistry;
use smallvec::{smallvec, SmallVec};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const RELAY_INTERVAL: Duration = Duration::from_millis(50);

pub struct PluginEventRelay {
    registry: Arc<PluginRegistry>,
    publisher: Arc<dyn ControlPublisher>,
    callback: Arc<dyn HostCallback>,
}

/// Relay thread handle. Clears the running flag and joins when dropped.
pub struct RelayHandle {
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl PluginEventRelay {
    pub fn new(
        registry: Arc<PluginRegistry>,
        publisher: Arc<dyn ControlPublisher>,
        callback: Arc<dyn HostCallback>,
    ) -> Self {
        Self {
            registry,
            publisher,
            callback,
        }
    }

    /// Start the relay thread. It runs while `running` is set.
    pub fn spawn(self, running: Arc<AtomicBool>, interval: Duration) -> Result<RelayHandle> {
        let thread_handle = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("plugin-event-relay".to_string())
                .spawn(move || {
                    tracing::debug!("Plugin event relay started");
                    while running.load(Ordering::Acquire) {
                        self.run_cycle();
                        thread::sleep(interval);
                    }
                    tracing::debug!("Plugin event relay stopped");
                })?
        };

        Ok(RelayHandle {
            running,
            thread_handle: Some(thread_handle),
        })
    }

    /// Visit every occupied slot once, in index order.
    ///
    /// A failing plugin is logged and skipped; the other slots are still served.
    pub fn run_cycle(&self) {
        let listener = self.registry.meter_listener().endpoint();

        for (slot, plugin) in self.registry.occupied() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.relay_plugin(plugin.as_ref(), listener.as_deref());
            }));

            if result.is_err() {
                tracing::warn!(
                    "Relay failed for plugin {} in slot {}, skipping",
                    plugin.id(),
                    slot
                );
            }
        }
    }

    fn relay_plugin(&self, plugin: &dyn PluginInstance, listener: Option<&ControlEndpoint>) {
        let ui = plugin.remote_ui().endpoint();
        let ui = ui.as_deref();

        for event in plugin.post_events().snapshot_and_clear() {
            self.relay_event(plugin, ui, event);
        }

        if let Some(ui) = ui {
            for index in 0..plugin.parameter_count() {
                let automatable_output = plugin
                    .parameter_data(index)
                    .is_some_and(|data| data.is_automatable_output());
                if automatable_output {
                    self.publisher.publish(
                        ui,
                        ControlMessage::Control {
                            index: index as i32,
                            value: plugin.parameter_value(index) as f32,
                        },
                    );
                }
            }
        }

        if let Some(listener) = listener {
            let [in1, in2, out1, out2] = plugin.peaks().get();
            self.publisher.publish(
                listener,
                ControlMessage::Peaks {
                    plugin_id: plugin.id(),
                    in1,
                    in2,
                    out1,
                    out2,
                },
            );
        }
    }

    fn relay_event(&self, plugin: &dyn PluginInstance, ui: Option<&ControlEndpoint>, event: PostEvent) {
        let id = plugin.id();

        match event.kind {
            PostEventKind::Debug => {
                self.callback
                    .notify(CallbackAction::Debug, id, event.index, 0, event.value);
            }

            PostEventKind::ParameterChange => {
                if let Some(ui) = ui.filter(|_| event.index >= 0) {
                    self.publisher.publish(
                        ui,
                        ControlMessage::Control {
                            index: event.index,
                            value: event.value as f32,
                        },
                    );
                }
                self.callback.notify(
                    CallbackAction::ParameterChanged,
                    id,
                    event.index,
                    0,
                    event.value,
                );
            }

            PostEventKind::ProgramChange => {
                if let Some(ui) = ui {
                    self.publisher.publish(
                        ui,
                        ControlMessage::Program {
                            index: plugin.current_program(),
                        },
                    );
                }
                self.callback
                    .notify(CallbackAction::ProgramChanged, id, event.index, 0, 0.0);
            }

            PostEventKind::MidiProgramChange => {
                let Some(midi_program) = usize::try_from(event.index)
                    .ok()
                    .and_then(|index| plugin.midi_program(index))
                else {
                    tracing::trace!(
                        "Plugin {} has no MIDI program {}, skipping",
                        id,
                        event.index
                    );
                    return;
                };

                if let Some(ui) = ui {
                    for message in midi_program_messages(plugin.format(), midi_program) {
                        self.publisher.publish(ui, message);
                    }
                }
                self.callback
                    .notify(CallbackAction::MidiProgramChanged, id, event.index, 0, 0.0);
            }

            // Notes are host-driven; the UI already knows about them
            PostEventKind::NoteOn => {
                self.callback.notify(
                    CallbackAction::NoteOn,
                    id,
                    event.index,
                    event.value as i32,
                    0.0,
                );
            }

            PostEventKind::NoteOff => {
                self.callback
                    .notify(CallbackAction::NoteOff, id, event.index, 0, 0.0);
            }
        }
    }
}

/// Messages selecting `midi_program` on a remote UI of the given format.
///
/// Formats using the note trick get a bank-select/program-change MIDI pair,
/// everything else a single `MidiProgram`.
pub(crate) fn midi_program_messages(
    format: PluginFormat,
    midi_program: &MidiProgram,
) -> SmallVec<[ControlMessage; 2]> {
    if format.requires_midi_program_note_trick() {
        // 7-bit MIDI data bytes only
        if midi_program.bank > 127 || midi_program.program > 127 {
            tracing::trace!(
                "MIDI program {}:{} does not fit the note trick, skipping",
                midi_program.bank,
                midi_program.program
            );
            return SmallVec::new();
        }
        smallvec![
            ControlMessage::bank_select(midi_program.bank as u8),
            ControlMessage::program_change(midi_program.program as u8),
        ]
    } else {
        smallvec![ControlMessage::MidiProgram {
            bank: midi_program.bank as i32,
            program: midi_program.program as i32,
        }]
    }
}

impl RelayHandle {
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
