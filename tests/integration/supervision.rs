//! Bridge process supervision through the host
//!
//! Bridge binaries are stand-in shell scripts and system tools.

use crate::helpers::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tether::plugin::{BridgeConfig, ControlEndpoint, GUI_CRASHED};
use tether::prelude::*;
use tether::{SupervisorOutcome, SupervisorState};

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn supervised_host(
    gui_timeout_ms: u64,
) -> (BridgeHost, crossbeam_channel::Receiver<tether::CallbackEvent>) {
    let (callback, events) = ChannelCallback::bounded(1024);
    let host = BridgeHost::builder()
        .config(BridgeConfig {
            relay_interval_ms: TEST_RELAY_INTERVAL_MS,
            gui_timeout_ms,
            exit_poll_interval_ms: 5,
            ..Default::default()
        })
        .callback(Arc::new(callback))
        .build()
        .unwrap();
    (host, events)
}

fn launch(binary: impl Into<PathBuf>) -> BridgeLaunch {
    BridgeLaunch {
        binary: binary.into(),
        label: "test_synth".to_string(),
        data1: "0".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_full_bridge_clean_exit() {
    let (host, events) = supervised_host(1000);
    host.add_plugin(test_synth(1)).unwrap();

    host.launch_bridge(1, BridgeMode::FullBridge, launch("/bin/true"))
        .unwrap();

    assert_eq!(
        host.wait_bridge(1, TEST_TIMEOUT),
        Some(SupervisorOutcome::BridgeClosed)
    );
    assert_eq!(host.supervisor_state(1), Some(SupervisorState::ClosedClean));
    let event = wait_for_action(&events, CallbackAction::BridgeClosed).unwrap();
    assert_eq!(event.plugin_id, 1);
}

#[test]
fn test_full_bridge_crash_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "crashing-bridge", "echo \"bridge for $4\"\nexit 3");

    let (host, events) = supervised_host(1000);
    host.add_plugin(test_synth(2)).unwrap();
    host.launch_bridge(2, BridgeMode::FullBridge, launch(binary))
        .unwrap();

    assert_eq!(
        host.wait_bridge(2, TEST_TIMEOUT),
        Some(SupervisorOutcome::BridgeCrashed { exit_code: 3 })
    );
    assert_eq!(host.supervisor_state(2), Some(SupervisorState::Crashed));
    let event = wait_for_action(&events, CallbackAction::BridgeCrashed).unwrap();
    assert_eq!((event.plugin_id, event.value1), (2, 3));
}

#[test]
fn test_missing_binary_fails_to_start() {
    let (host, events) = supervised_host(1000);
    host.add_plugin(test_synth(3)).unwrap();
    host.add_plugin(test_synth(4)).unwrap();

    host.launch_bridge(3, BridgeMode::FullBridge, launch("/nonexistent/bridge"))
        .unwrap();
    assert_eq!(
        host.wait_bridge(3, TEST_TIMEOUT),
        Some(SupervisorOutcome::StartFailed)
    );
    let event = wait_for_action(&events, CallbackAction::BridgeCrashed).unwrap();
    assert_eq!(event.value1, -1);

    host.launch_bridge(4, BridgeMode::FileGui, launch("/nonexistent/ui"))
        .unwrap();
    assert_eq!(
        host.wait_bridge(4, TEST_TIMEOUT),
        Some(SupervisorOutcome::StartFailed)
    );
    let event = wait_for_action(&events, CallbackAction::ShowGui).unwrap();
    assert_eq!((event.plugin_id, event.value1), (4, 0));
}

#[test]
fn test_gui_crash_before_confirming() {
    let (host, events) = supervised_host(2000);
    host.add_plugin(test_synth(5)).unwrap();

    host.launch_bridge(5, BridgeMode::FileGui, launch("/bin/false"))
        .unwrap();

    assert_eq!(
        host.wait_bridge(5, TEST_TIMEOUT),
        Some(SupervisorOutcome::GuiCrashed { exit_code: 1 })
    );
    let event = wait_for_action(&events, CallbackAction::ShowGui).unwrap();
    assert_eq!(event.value1, GUI_CRASHED);
}

#[test]
fn test_gui_that_never_confirms_is_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "silent-ui", "sleep 30");

    let (host, events) = supervised_host(100);
    host.add_plugin(test_synth(6)).unwrap();
    host.launch_bridge(6, BridgeMode::DataGui, launch(binary))
        .unwrap();

    assert_eq!(
        host.wait_bridge(6, TEST_TIMEOUT),
        Some(SupervisorOutcome::GuiTimeout)
    );
    let event = wait_for_action(&events, CallbackAction::ShowGui).unwrap();
    assert_eq!((event.plugin_id, event.value1), (6, 0));
}

#[test]
fn test_confirmed_gui_closes_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "short-ui", "sleep 0.3");

    let (host, events) = supervised_host(2000);
    let synth = test_synth(7);
    host.add_plugin(synth.clone()).unwrap();
    host.launch_bridge(7, BridgeMode::FileGui, launch(binary))
        .unwrap();

    assert!(wait_until(|| {
        host.supervisor_state(7) == Some(SupervisorState::Confirming)
    }));
    // Stands in for the UI's Update announcement
    synth
        .remote_ui()
        .attach(ControlEndpoint::parse("osc.udp://127.0.0.1:9/ui").unwrap());

    let event = wait_for_action(&events, CallbackAction::ShowGui).unwrap();
    assert_eq!(event.value1, 1);

    assert_eq!(
        host.wait_bridge(7, TEST_TIMEOUT),
        Some(SupervisorOutcome::GuiClosed)
    );
    let event = wait_for_action(&events, CallbackAction::ShowGui).unwrap();
    assert_eq!(event.value1, 0);
    assert!(!synth.remote_ui().is_attached());
}

#[test]
fn test_remove_plugin_stops_bridge() {
    let dir = tempfile::tempdir().unwrap();
    let binary = script(dir.path(), "long-bridge", "sleep 30");

    let (host, _events) = supervised_host(1000);
    host.add_plugin(test_synth(8)).unwrap();
    host.launch_bridge(8, BridgeMode::FullBridge, launch(binary))
        .unwrap();
    assert!(wait_until(|| {
        host.supervisor_state(8) == Some(SupervisorState::WaitingExit)
    }));

    assert!(host.remove_plugin(8).is_some());
    assert!(host.supervisor_state(8).is_none());
}
