//! Host <-> UI session integration tests
//!
//! The UI side runs in-process on its own thread, wired the same way the
//! `ui-bridge` binary wires it.

use crate::helpers::*;
use std::thread;
use std::time::Duration;
use tether::prelude::*;
use tether::ui::{ControlReceiver, HeadlessUi, HeadlessWindow, HostLink};

type HeadlessSession = UiSession<HeadlessUi, HeadlessWindow>;

fn spawn_ui(control_url: String) -> thread::JoinHandle<HeadlessSession> {
    thread::spawn(move || {
        let link = HostLink::connect(&control_url).unwrap();
        let session = UiSession::new(
            HeadlessUi::new("Test Synth (GUI)"),
            HeadlessWindow::default(),
            64,
        );
        let receiver = ControlReceiver::bind(
            "127.0.0.1:0".parse().unwrap(),
            "/ui",
            session.queue(),
        )
        .unwrap();

        let mut session = session.with_host(link, receiver.url());
        session.run(Duration::from_millis(2)).unwrap();
        session
    })
}

#[test]
fn test_ui_receives_state_and_changes() {
    let (host, events) = test_host();
    let synth = test_synth(1);
    host.add_plugin(synth.clone()).unwrap();

    // Changed before any UI exists; must arrive with the initial state
    assert!(synth.change_parameter(1, 0.8));
    wait_for_action(&events, CallbackAction::ParameterChanged).unwrap();

    let ui = spawn_ui(host.control_endpoint().with_plugin_id(1).url());
    assert!(synth.remote_ui().wait_attached(TEST_TIMEOUT));

    assert!(synth.change_parameter(0, 0.75));
    let event = wait_for_action(&events, CallbackAction::ParameterChanged).unwrap();
    assert_eq!(event.value1, 0);

    assert!(synth.change_program(1));
    wait_for_action(&events, CallbackAction::ProgramChanged).unwrap();

    assert!(host.set_gui_visible(1, true).unwrap());
    assert!(host.close_gui(1).unwrap());
    let session = ui.join().unwrap();

    assert_eq!(session.ui().parameter(0), Some(0.75));
    assert_eq!(session.ui().parameter(1), Some(0.8));
    assert_eq!(session.ui().program(), Some(1));
    assert!(session.window().is_visible());
    assert!(session.window().quit_requested());

    // The UI says goodbye on its way out
    let event = wait_for_action(&events, CallbackAction::ShowGui).unwrap();
    assert_eq!((event.plugin_id, event.value1), (1, 0));
    assert!(wait_until(|| !synth.remote_ui().is_attached()));
}

#[test]
fn test_ui_originated_traffic() {
    let (host, events) = test_host();
    let synth = test_synth(2);
    host.add_plugin(synth.clone()).unwrap();

    let link = HostLink::connect(&host.control_endpoint().with_plugin_id(2).url()).unwrap();

    assert!(link.send_control(1, 0.25));
    let event = wait_for_action(&events, CallbackAction::ParameterChanged).unwrap();
    assert_eq!((event.plugin_id, event.value1, event.value3), (2, 1, 0.25));
    assert_eq!(synth.parameter_value(1), 0.25);

    assert!(link.send_program(1));
    let event = wait_for_action(&events, CallbackAction::ProgramChanged).unwrap();
    assert_eq!(event.value1, 1);
    assert_eq!(synth.current_program(), 1);

    assert!(link.send_note_on(0, 60, 100));
    let event = wait_for_action(&events, CallbackAction::NoteOn).unwrap();
    assert_eq!((event.value1, event.value2), (60, 100));

    assert!(link.send_note_off(0, 60));
    let event = wait_for_action(&events, CallbackAction::NoteOff).unwrap();
    assert_eq!(event.value1, 60);

    assert!(link.send_resize(640, 480));
    let event = wait_for_action(&events, CallbackAction::ResizeGui).unwrap();
    assert_eq!((event.value1, event.value2), (640, 480));
}

#[test]
fn test_traffic_for_unknown_plugin_is_ignored() {
    let (host, events) = test_host();
    host.add_plugin(test_synth(3)).unwrap();

    let stray = HostLink::connect(&host.control_endpoint().with_plugin_id(99).url()).unwrap();
    assert!(stray.send_control(0, 0.5));

    let link = HostLink::connect(&host.control_endpoint().with_plugin_id(3).url()).unwrap();
    assert!(link.send_resize(1, 1));

    // Only the known plugin's message comes through
    let event = events.recv_timeout(TEST_TIMEOUT).unwrap();
    assert_eq!(event.action, CallbackAction::ResizeGui);
    assert_eq!(event.plugin_id, 3);
}
