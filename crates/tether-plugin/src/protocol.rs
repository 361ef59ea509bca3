//! Control protocol shared by the host and bridged processes.
//!
//! Every datagram carries one bincode-encoded [`ControlPacket`]. Endpoints are
//! addressed by URL (`osc.udp://host:port/path`); a plugin's endpoint is the
//! host base URL followed by `/<plugin id>`.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

pub const URL_SCHEME: &str = "osc.udp://";

pub const MIDI_STATUS_NOTE_OFF: u8 = 0x80;
pub const MIDI_STATUS_NOTE_ON: u8 = 0x90;
pub const MIDI_STATUS_CONTROL_CHANGE: u8 = 0xB0;
pub const MIDI_STATUS_PROGRAM_CHANGE: u8 = 0xC0;
pub const MIDI_CONTROL_BANK_SELECT: u8 = 0x00;

fn default_relay_interval_ms() -> u64 {
    50
}

fn default_ui_queue_capacity() -> usize {
    256
}

fn default_post_event_capacity() -> usize {
    152
}

fn default_max_plugins() -> usize {
    99
}

fn default_gui_timeout_ms() -> u64 {
    4000
}

fn default_start_timeout_ms() -> u64 {
    5000
}

fn default_exit_poll_interval_ms() -> u64 {
    20
}

fn default_control_bind() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
}

fn default_control_path() -> String {
    "/tether".to_string()
}

/// Control message exchanged between the host and a bridged UI or plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    // Either direction
    Control { index: i32, value: f32 },
    Program { index: i32 },
    MidiProgram { bank: i32, program: i32 },
    /// Raw MIDI packet: port, status, data1, data2.
    Midi { data: [u8; 4] },

    // Host to UI
    Show,
    Hide,
    Resize { width: i32, height: i32 },
    Quit,
    Peaks {
        plugin_id: i32,
        in1: f32,
        in2: f32,
        out1: f32,
        out2: f32,
    },

    // UI to host
    /// The UI is up and listening at `url`.
    Update { url: String },
    Exiting,

    // Global listener
    Register { url: String },
    Unregister,
}

impl ControlMessage {
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::Midi {
            data: [0, MIDI_STATUS_NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
        }
    }

    pub fn note_off(channel: u8, note: u8) -> Self {
        Self::Midi {
            data: [0, MIDI_STATUS_NOTE_OFF | (channel & 0x0F), note & 0x7F, 0],
        }
    }

    pub fn bank_select(bank: u8) -> Self {
        Self::Midi {
            data: [
                0,
                MIDI_STATUS_CONTROL_CHANGE,
                MIDI_CONTROL_BANK_SELECT,
                bank & 0x7F,
            ],
        }
    }

    pub fn program_change(program: u8) -> Self {
        Self::Midi {
            data: [0, MIDI_STATUS_PROGRAM_CHANGE, program & 0x7F, 0],
        }
    }
}

/// One datagram on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPacket {
    pub path: String,
    pub message: ControlMessage,
}

impl ControlPacket {
    pub fn new(path: impl Into<String>, message: ControlMessage) -> Self {
        Self {
            path: path.into(),
            message,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

/// Resolved control-protocol address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlEndpoint {
    addr: SocketAddr,
    path: String,
}

impl ControlEndpoint {
    pub fn new(addr: SocketAddr, path: impl Into<String>) -> Self {
        let addr = if addr.ip().is_unspecified() {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        } else {
            addr
        };
        Self {
            addr,
            path: normalize_path(&path.into()),
        }
    }

    /// Parse `osc.udp://host:port/path`.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| BridgeError::InvalidEndpoint(url.to_string()))?;

        let (authority, path) = match rest.find('/') {
            Some(pos) => rest.split_at(pos),
            None => (rest, ""),
        };

        let addr = authority
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| BridgeError::InvalidEndpoint(url.to_string()))?;

        Ok(Self::new(addr, path))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> String {
        format!("{}{}{}", URL_SCHEME, self.addr, self.path)
    }

    /// Endpoint of one plugin below this base endpoint.
    pub fn with_plugin_id(&self, plugin_id: i32) -> Self {
        Self {
            addr: self.addr,
            path: format!("{}/{}", self.path, plugin_id),
        }
    }

    /// Plugin id addressed by `path` relative to this base endpoint.
    pub fn plugin_id_of(&self, path: &str) -> Option<i32> {
        path.strip_prefix(self.path.as_str())?
            .strip_prefix('/')?
            .parse()
            .ok()
    }
}

impl fmt::Display for ControlEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Plugin Event Relay cycle.
    #[serde(default = "default_relay_interval_ms")]
    pub relay_interval_ms: u64,
    /// Inbound Control Queue slots on the UI side.
    #[serde(default = "default_ui_queue_capacity")]
    pub ui_queue_capacity: usize,
    /// Per-plugin post-event buffer size.
    #[serde(default = "default_post_event_capacity")]
    pub post_event_capacity: usize,
    #[serde(default = "default_max_plugins")]
    pub max_plugins: usize,
    /// How long a bridged GUI may take to announce itself.
    #[serde(default = "default_gui_timeout_ms")]
    pub gui_timeout_ms: u64,
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,
    #[serde(default = "default_exit_poll_interval_ms")]
    pub exit_poll_interval_ms: u64,
    #[serde(default = "default_control_bind")]
    pub control_bind: SocketAddr,
    #[serde(default = "default_control_path")]
    pub control_path: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            relay_interval_ms: default_relay_interval_ms(),
            ui_queue_capacity: default_ui_queue_capacity(),
            post_event_capacity: default_post_event_capacity(),
            max_plugins: default_max_plugins(),
            gui_timeout_ms: default_gui_timeout_ms(),
            start_timeout_ms: default_start_timeout_ms(),
            exit_poll_interval_ms: default_exit_poll_interval_ms(),
            control_bind: default_control_bind(),
            control_path: default_control_path(),
        }
    }
}

impl BridgeConfig {
    pub fn relay_interval(&self) -> Duration {
        Duration::from_millis(self.relay_interval_ms)
    }

    pub fn gui_timeout(&self) -> Duration {
        Duration::from_millis(self.gui_timeout_ms)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn exit_poll_interval(&self) -> Duration {
        Duration::from_millis(self.exit_poll_interval_ms)
    }
}
