//! One UI process run: the UI, its window and the queue feeding them.

use crate::error::Result;
use crate::host_link::HostLink;
use crate::queue::ControlQueue;
use crate::ui::{PluginUi, UiWindow};
use std::sync::Arc;
use tether_plugin::BridgeConfig;
use std::thread;
use std::time::Duration;

/// Default UI loop period.
pub const UI_TICK: Duration = Duration::from_millis(30);

struct HostAnnouncement {
    link: HostLink,
    listen_url: String,
}

/// Owns everything the UI thread touches. Constructed at process entry and
/// driven by [`UiSession::run`] until a `Quit` arrives.
pub struct UiSession<U: PluginUi, W: UiWindow> {
    queue: Arc<ControlQueue>,
    ui: U,
    window: W,
    host: Option<HostAnnouncement>,
}

impl<U: PluginUi, W: UiWindow> UiSession<U, W> {
    pub fn new(ui: U, window: W, queue_capacity: usize) -> Self {
        Self {
            queue: Arc::new(ControlQueue::new(queue_capacity)),
            ui,
            window,
            host: None,
        }
    }

    /// Queue sized by `config.ui_queue_capacity`.
    pub fn from_config(ui: U, window: W, config: &BridgeConfig) -> Self {
        Self::new(ui, window, config.ui_queue_capacity)
    }

    /// Announce `listen_url` to the host once the UI is up, and say goodbye
    /// when the session ends.
    pub fn with_host(mut self, link: HostLink, listen_url: impl Into<String>) -> Self {
        self.host = Some(HostAnnouncement {
            link,
            listen_url: listen_url.into(),
        });
        self
    }

    /// Queue to hand to producers (usually a `ControlReceiver`).
    pub fn queue(&self) -> Arc<ControlQueue> {
        Arc::clone(&self.queue)
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    /// Apply what is queued. False once the session should stop.
    pub fn tick(&mut self) -> bool {
        self.queue.drain_and_apply(&mut self.ui, &mut self.window)
    }

    pub fn run(&mut self, interval: Duration) -> Result<()> {
        self.ui.init()?;
        if let Some(host) = &self.host {
            host.link.send_update(host.listen_url.as_str());
        }

        while self.tick() {
            thread::sleep(interval);
        }

        self.ui.close();
        if let Some(host) = &self.host {
            host.link.send_exiting();
        }
        Ok(())
    }
}
