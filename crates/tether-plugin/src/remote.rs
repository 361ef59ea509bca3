//! Attachment point for a remote listener (a bridged UI or a metering client).

use crate::protocol::ControlEndpoint;
use arc_swap::ArcSwapOption;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Endpoint of whoever is currently listening, if anyone.
///
/// Reads are lock-free; the mutex/condvar pair only serves [`RemoteLink::wait_attached`].
pub struct RemoteLink {
    target: ArcSwapOption<ControlEndpoint>,
    lock: Mutex<()>,
    attached: Condvar,
}

impl RemoteLink {
    pub fn new() -> Self {
        Self {
            target: ArcSwapOption::empty(),
            lock: Mutex::new(()),
            attached: Condvar::new(),
        }
    }

    pub fn attach(&self, endpoint: ControlEndpoint) {
        self.target.store(Some(Arc::new(endpoint)));
        let _guard = self.lock.lock();
        self.attached.notify_all();
    }

    pub fn detach(&self) -> Option<Arc<ControlEndpoint>> {
        self.target.swap(None)
    }

    pub fn endpoint(&self) -> Option<Arc<ControlEndpoint>> {
        self.target.load_full()
    }

    pub fn is_attached(&self) -> bool {
        self.target.load().is_some()
    }

    /// Block until a listener attaches or `timeout` elapses.
    pub fn wait_attached(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_attached() {
            if self.attached.wait_until(&mut guard, deadline).timed_out() {
                return self.is_attached();
            }
        }
        true
    }
}

impl Default for RemoteLink {
    fn default() -> Self {
        Self::new()
    }
}
