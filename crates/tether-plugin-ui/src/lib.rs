//! UI process side of tether-plugin
//!
//! A bridged UI runs as its own process: the host hands it a control URL, it
//! listens for control traffic on a socket of its own, queues what arrives and
//! applies it on the UI thread.
//!
//! This crate is used by the `ui-bridge` binary and by toolkit-specific UI
//! processes. Use `tether-plugin` on the host side.

pub mod error;
pub use error::{Result, UiError};

pub mod queue;
pub use queue::{ControlQueue, MessageKind, UiMessage, MAX_BRIDGE_MESSAGES};

pub mod ui;
pub use ui::{PluginUi, UiWindow};

pub mod headless;
pub use headless::{HeadlessUi, HeadlessWindow};

mod host_link;
pub use host_link::HostLink;

mod receiver;
pub use receiver::{ControlReceiver, MessageTranslator};

mod session;
pub use session::{UiSession, UI_TICK};
