//! Builder for configuring and constructing a `BridgeHost`.

use crate::{BridgeHost, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tether_plugin::{BridgeConfig, ControlPublisher, HostCallback, NullCallback, UdpPublisher};

/// # Example
///
/// ```ignore
/// use tether::prelude::*;
///
/// let (callback, events) = ChannelCallback::bounded(1024);
/// let host = BridgeHost::builder()
///     .callback(Arc::new(callback))
///     .build()?;
///
/// println!("control URL: {}", host.control_url());
/// ```
#[derive(Default)]
pub struct BridgeHostBuilder {
    config: BridgeConfig,
    callback: Option<Arc<dyn HostCallback>>,
    publisher: Option<Arc<dyn ControlPublisher>>,
}

impl BridgeHostBuilder {
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 127.0.0.1 on an ephemeral port
    pub fn control_bind(mut self, addr: SocketAddr) -> Self {
        self.config.control_bind = addr;
        self
    }

    /// Default: 99
    pub fn max_plugins(mut self, count: usize) -> Self {
        self.config.max_plugins = count;
        self
    }

    /// Default: 50 ms
    pub fn relay_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.relay_interval_ms = interval_ms;
        self
    }

    /// Where relayed events and bridge lifecycle notifications go.
    /// Without one they are discarded.
    pub fn callback(mut self, callback: Arc<dyn HostCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Replace the UDP publisher, e.g. with a recording one in tests.
    pub fn publisher(mut self, publisher: Arc<dyn ControlPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> Result<BridgeHost> {
        let callback: Arc<dyn HostCallback> = self
            .callback
            .unwrap_or_else(|| Arc::new(NullCallback));

        let publisher: Arc<dyn ControlPublisher> = match self.publisher {
            Some(publisher) => publisher,
            None => Arc::new(UdpPublisher::new()?),
        };

        BridgeHost::start(self.config, publisher, callback)
    }
}
