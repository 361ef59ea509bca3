//! Test helpers and fixtures for Tether integration tests
//!
//! Everything binds to loopback on ephemeral ports so tests can run in
//! parallel.

use std::thread;
use std::time::{Duration, Instant};
use tether::plugin::{CallbackEvent, ParameterData};
use tether::prelude::*;

/// How long a test waits for anything crossing a socket or a process boundary
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay period used by test hosts
pub const TEST_RELAY_INTERVAL_MS: u64 = 5;

/// Host with fast relay cycles whose notifications land in the returned channel.
pub fn test_host() -> (BridgeHost, crossbeam_channel::Receiver<CallbackEvent>) {
    let (callback, events) = ChannelCallback::bounded(1024);
    let host = BridgeHost::builder()
        .relay_interval_ms(TEST_RELAY_INTERVAL_MS)
        .callback(Arc::new(callback))
        .build()
        .expect("Failed to create test host");
    (host, events)
}

/// Two-parameter synth with a program list.
pub fn test_synth(id: i32) -> Arc<BridgedPlugin> {
    Arc::new(
        BridgedPlugin::builder(id, "Test Synth")
            .parameter(ParameterData::input("Cutoff").range(0.0, 1.0, 0.5))
            .parameter(ParameterData::input("Resonance").range(0.0, 1.0, 0.1))
            .program("Init")
            .program("Bass")
            .build(),
    )
}

/// Next event matching `action`, skipping others.
pub fn wait_for_action(
    events: &crossbeam_channel::Receiver<CallbackEvent>,
    action: CallbackAction,
) -> Option<CallbackEvent> {
    let deadline = Instant::now() + TEST_TIMEOUT;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match events.recv_timeout(remaining) {
            Ok(event) if event.action == action => return Some(event),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

/// Poll `condition` until it holds or the test timeout passes.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TEST_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
