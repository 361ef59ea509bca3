//! Host callback sink.
//!
//! Every asynchronous outcome of the bridge (relayed post-events, GUI and
//! bridge lifecycle) reaches the host through [`HostCallback::notify`].
//! Implementations must return promptly; they are called from the relay and
//! supervisor threads.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// `value1` of a [`CallbackAction::ShowGui`] notification when the GUI crashed.
pub const GUI_CRASHED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackAction {
    Debug,
    ParameterChanged,
    ProgramChanged,
    MidiProgramChanged,
    NoteOn,
    NoteOff,
    /// `value1`: 1 shown, 0 hidden or closed, [`GUI_CRASHED`] crashed.
    ShowGui,
    ResizeGui,
    BridgeClosed,
    /// `value1`: exit code of the bridge process.
    BridgeCrashed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallbackEvent {
    pub action: CallbackAction,
    pub plugin_id: i32,
    pub value1: i32,
    pub value2: i32,
    pub value3: f64,
}

pub trait HostCallback: Send + Sync {
    fn notify(&self, action: CallbackAction, plugin_id: i32, value1: i32, value2: i32, value3: f64);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCallback;

impl HostCallback for NullCallback {
    fn notify(&self, _: CallbackAction, _: i32, _: i32, _: i32, _: f64) {}
}

/// Forwards notifications into a bounded channel for the host's main thread.
///
/// Never blocks: when the host falls behind, notifications are dropped.
#[derive(Debug, Clone)]
pub struct ChannelCallback {
    sender: Sender<CallbackEvent>,
}

impl ChannelCallback {
    pub fn bounded(capacity: usize) -> (Self, Receiver<CallbackEvent>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl HostCallback for ChannelCallback {
    fn notify(&self, action: CallbackAction, plugin_id: i32, value1: i32, value2: i32, value3: f64) {
        let event = CallbackEvent {
            action,
            plugin_id,
            value1,
            value2,
            value3,
        };

        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!("Host callback queue full, dropping {:?}", event.action);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
