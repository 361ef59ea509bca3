//! UI → host sender.

use crate::error::Result;
use std::sync::Arc;
use tether_plugin::{ControlEndpoint, ControlMessage, ControlPublisher, UdpPublisher};

/// Sends this UI's traffic to the plugin endpoint the host gave us.
#[derive(Clone)]
pub struct HostLink {
    endpoint: ControlEndpoint,
    publisher: Arc<dyn ControlPublisher>,
}

impl HostLink {
    pub fn new(endpoint: ControlEndpoint, publisher: Arc<dyn ControlPublisher>) -> Self {
        Self {
            endpoint,
            publisher,
        }
    }

    /// Link to `url` (`osc.udp://host:port/<base>/<plugin id>`) over a fresh publisher.
    pub fn connect(url: &str) -> Result<Self> {
        let endpoint = ControlEndpoint::parse(url)?;
        Ok(Self::new(endpoint, Arc::new(UdpPublisher::new()?)))
    }

    pub fn endpoint(&self) -> &ControlEndpoint {
        &self.endpoint
    }

    fn send(&self, message: ControlMessage) -> bool {
        self.publisher.publish(&self.endpoint, message)
    }

    /// Tell the host the UI is up and listening at `url`.
    pub fn send_update(&self, url: impl Into<String>) -> bool {
        self.send(ControlMessage::Update { url: url.into() })
    }

    pub fn send_exiting(&self) -> bool {
        self.send(ControlMessage::Exiting)
    }

    pub fn send_control(&self, index: i32, value: f32) -> bool {
        self.send(ControlMessage::Control { index, value })
    }

    pub fn send_program(&self, index: i32) -> bool {
        self.send(ControlMessage::Program { index })
    }

    pub fn send_midi_program(&self, bank: i32, program: i32) -> bool {
        self.send(ControlMessage::MidiProgram { bank, program })
    }

    pub fn send_note_on(&self, channel: u8, note: u8, velocity: u8) -> bool {
        self.send(ControlMessage::note_on(channel, note, velocity))
    }

    pub fn send_note_off(&self, channel: u8, note: u8) -> bool {
        self.send(ControlMessage::note_off(channel, note))
    }

    pub fn send_resize(&self, width: i32, height: i32) -> bool {
        self.send(ControlMessage::Resize { width, height })
    }
}
