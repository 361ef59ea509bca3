//! Inbound Control Queue.
//!
//! Bounded queue of control messages waiting for the UI thread. Any number of
//! threads may push; the UI loop drains it on every tick. When the queue is
//! full new messages are dropped.
//!
//! Messages are applied outside of any lock, so handlers may take their time
//! or push back into the queue without stalling producers.

use crate::ui::{PluginUi, UiWindow};
use crossbeam::queue::ArrayQueue;

pub const MAX_BRIDGE_MESSAGES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Parameter,
    Program,
    MidiProgram,
    NoteOn,
    NoteOff,
    ShowGui,
    ResizeGui,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiMessage {
    Parameter { index: i32, value: f32 },
    Program { index: i32 },
    MidiProgram { bank: i32, program: i32 },
    NoteOn { note: i32, velocity: i32 },
    NoteOff { note: i32 },
    ShowGui { visible: bool },
    ResizeGui { width: i32, height: i32 },
    Quit,
}

impl UiMessage {
    /// Build from the untyped `(kind, value1, value2, value3)` form.
    /// Fields a kind does not use are ignored.
    pub fn from_raw(kind: MessageKind, value1: i32, value2: i32, value3: f32) -> Self {
        match kind {
            MessageKind::Parameter => UiMessage::Parameter {
                index: value1,
                value: value3,
            },
            MessageKind::Program => UiMessage::Program { index: value1 },
            MessageKind::MidiProgram => UiMessage::MidiProgram {
                bank: value1,
                program: value2,
            },
            MessageKind::NoteOn => UiMessage::NoteOn {
                note: value1,
                velocity: value2,
            },
            MessageKind::NoteOff => UiMessage::NoteOff { note: value1 },
            MessageKind::ShowGui => UiMessage::ShowGui {
                visible: value1 != 0,
            },
            MessageKind::ResizeGui => UiMessage::ResizeGui {
                width: value1,
                height: value2,
            },
            MessageKind::Quit => UiMessage::Quit,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            UiMessage::Parameter { .. } => MessageKind::Parameter,
            UiMessage::Program { .. } => MessageKind::Program,
            UiMessage::MidiProgram { .. } => MessageKind::MidiProgram,
            UiMessage::NoteOn { .. } => MessageKind::NoteOn,
            UiMessage::NoteOff { .. } => MessageKind::NoteOff,
            UiMessage::ShowGui { .. } => MessageKind::ShowGui,
            UiMessage::ResizeGui { .. } => MessageKind::ResizeGui,
            UiMessage::Quit => MessageKind::Quit,
        }
    }
}

pub struct ControlQueue {
    queue: ArrayQueue<UiMessage>,
}

impl ControlQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Returns false if the queue was full and `message` was dropped.
    pub fn push(&self, message: UiMessage) -> bool {
        match self.queue.push(message) {
            Ok(()) => true,
            Err(dropped) => {
                tracing::trace!("Control queue full, dropping {:?}", dropped.kind());
                false
            }
        }
    }

    pub fn enqueue(&self, kind: MessageKind, value1: i32, value2: i32, value3: f32) -> bool {
        self.push(UiMessage::from_raw(kind, value1, value2, value3))
    }

    /// Apply queued messages in order.
    ///
    /// Returns false once a `Quit` was applied; messages queued behind it stay
    /// queued. Only messages present when the pass starts are applied.
    pub fn drain_and_apply(&self, ui: &mut dyn PluginUi, window: &mut dyn UiWindow) -> bool {
        let pending = self.queue.len();

        for _ in 0..pending {
            let Some(message) = self.queue.pop() else {
                break;
            };

            match message {
                UiMessage::Parameter { index, value } => ui.update_parameter(index, value),
                UiMessage::Program { index } => ui.update_program(index),
                UiMessage::MidiProgram { bank, program } => ui.update_midi_program(bank, program),
                UiMessage::NoteOn { note, velocity } => ui.send_note_on(note, velocity),
                UiMessage::NoteOff { note } => ui.send_note_off(note),
                UiMessage::ShowGui { visible: true } => window.show(),
                UiMessage::ShowGui { visible: false } => window.hide(),
                UiMessage::ResizeGui { width, height } => window.resize(width, height),
                UiMessage::Quit => {
                    window.quit();
                    return false;
                }
            }
        }

        true
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl Default for ControlQueue {
    fn default() -> Self {
        Self::new(MAX_BRIDGE_MESSAGES)
    }
}
