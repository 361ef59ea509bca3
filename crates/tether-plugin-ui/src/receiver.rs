//! Receive path of the UI process: UDP socket → [`ControlQueue`].

use crate::error::Result;
use crate::queue::{ControlQueue, UiMessage};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tether_plugin::protocol::{
    MIDI_CONTROL_BANK_SELECT, MIDI_STATUS_CONTROL_CHANGE, MIDI_STATUS_NOTE_OFF,
    MIDI_STATUS_NOTE_ON, MIDI_STATUS_PROGRAM_CHANGE,
};
use tether_plugin::transport::{self, ControlSocket, RECV_POLL_INTERVAL};
use tether_plugin::{ControlEndpoint, ControlMessage};

/// Turns wire messages into queue entries.
///
/// Keeps the last bank select so a following MIDI program change can be
/// reported as a bank/program pair.
#[derive(Debug, Default)]
pub struct MessageTranslator {
    bank: i32,
}

impl MessageTranslator {
    pub fn translate(&mut self, message: ControlMessage) -> Option<UiMessage> {
        match message {
            ControlMessage::Control { index, value } => Some(UiMessage::Parameter { index, value }),
            ControlMessage::Program { index } => Some(UiMessage::Program { index }),
            ControlMessage::MidiProgram { bank, program } => {
                Some(UiMessage::MidiProgram { bank, program })
            }
            ControlMessage::Midi { data } => self.translate_midi(data),
            ControlMessage::Show => Some(UiMessage::ShowGui { visible: true }),
            ControlMessage::Hide => Some(UiMessage::ShowGui { visible: false }),
            ControlMessage::Resize { width, height } => {
                Some(UiMessage::ResizeGui { width, height })
            }
            ControlMessage::Quit => Some(UiMessage::Quit),
            _ => None,
        }
    }

    fn translate_midi(&mut self, data: [u8; 4]) -> Option<UiMessage> {
        let [_, status, data1, data2] = data;
        match status & 0xF0 {
            MIDI_STATUS_NOTE_ON if data2 > 0 => Some(UiMessage::NoteOn {
                note: data1 as i32,
                velocity: data2 as i32,
            }),
            MIDI_STATUS_NOTE_ON | MIDI_STATUS_NOTE_OFF => Some(UiMessage::NoteOff {
                note: data1 as i32,
            }),
            MIDI_STATUS_CONTROL_CHANGE if data1 == MIDI_CONTROL_BANK_SELECT => {
                self.bank = data2 as i32;
                None
            }
            MIDI_STATUS_PROGRAM_CHANGE => Some(UiMessage::MidiProgram {
                bank: self.bank,
                program: data1 as i32,
            }),
            _ => None,
        }
    }
}

/// Receive thread feeding a [`ControlQueue`]. Stops when dropped.
pub struct ControlReceiver {
    endpoint: ControlEndpoint,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl ControlReceiver {
    /// Listen on `addr` for packets addressed to `path`.
    pub fn bind(addr: SocketAddr, path: &str, queue: Arc<ControlQueue>) -> Result<Self> {
        let socket = transport::bind_std(addr)?;
        let endpoint = ControlEndpoint::new(socket.local_addr()?, path);
        let running = Arc::new(AtomicBool::new(true));

        let thread_handle = {
            let running = Arc::clone(&running);
            let path = endpoint.path().to_string();
            thread::Builder::new()
                .name("control-receiver".to_string())
                .spawn(move || Self::receiver_thread_main(socket, path, queue, running))?
        };

        Ok(Self {
            endpoint,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    fn receiver_thread_main(
        socket: std::net::UdpSocket,
        path: String,
        queue: Arc<ControlQueue>,
        running: Arc<AtomicBool>,
    ) {
        let runtime = match transport::socket_runtime() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Control receiver runtime failed: {}", e);
                return;
            }
        };

        runtime.block_on(async {
            let mut socket = match ControlSocket::from_std(socket) {
                Ok(socket) => socket,
                Err(e) => {
                    tracing::error!("Control receiver socket failed: {}", e);
                    return;
                }
            };
            let mut translator = MessageTranslator::default();

            while running.load(Ordering::Acquire) {
                match socket.recv_packet_timeout(RECV_POLL_INTERVAL).await {
                    Ok(Some((packet, _from))) => {
                        if packet.path != path {
                            tracing::debug!("Ignoring packet for {}", packet.path);
                            continue;
                        }
                        if let Some(message) = translator.translate(packet.message) {
                            queue.push(message);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::debug!("Control receiver: {}", e),
                }
            }
        });
    }

    pub fn endpoint(&self) -> &ControlEndpoint {
        &self.endpoint
    }

    pub fn url(&self) -> String {
        self.endpoint.url()
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ControlReceiver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
