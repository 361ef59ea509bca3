//! BridgeHost lifecycle integration tests

use crate::helpers::*;
use std::net::UdpSocket;
use std::time::Duration;
use tether::plugin::{ControlPacket, UdpPublisher};
use tether::prelude::*;
use tether::{ControlEndpoint, ControlMessage, ControlPublisher, Error};

#[test]
fn test_host_sequential_creation() {
    for _ in 0..3 {
        let (host, _events) = test_host();
        assert!(host.is_running());
        assert!(host.control_url().starts_with("osc.udp://127.0.0.1:"));
        // Dropped here, freeing its socket and threads
    }
}

#[test]
fn test_config_reaches_host() {
    let host = BridgeHost::builder()
        .max_plugins(2)
        .relay_interval_ms(TEST_RELAY_INTERVAL_MS)
        .build()
        .unwrap();

    assert_eq!(host.config().max_plugins, 2);
    assert_eq!(host.registry().capacity(), 2);

    host.add_plugin(test_synth(1)).unwrap();
    host.add_plugin(test_synth(2)).unwrap();
    assert!(matches!(
        host.add_plugin(test_synth(3)),
        Err(Error::RegistryFull(2))
    ));
}

#[test]
fn test_host_changes_reach_callback() {
    let (host, events) = test_host();
    let synth = test_synth(4);
    host.add_plugin(synth.clone()).unwrap();

    assert!(synth.change_parameter(0, 2.0));
    let event = wait_for_action(&events, CallbackAction::ParameterChanged).unwrap();
    assert_eq!((event.plugin_id, event.value1), (4, 0));
    // Clamped to the parameter range
    assert_eq!(event.value3, 1.0);

    assert!(synth.change_program(1));
    let event = wait_for_action(&events, CallbackAction::ProgramChanged).unwrap();
    assert_eq!(event.value1, 1);
}

#[test]
fn test_meter_listener_receives_peaks() {
    let (host, _events) = test_host();
    let synth = test_synth(6);
    synth.peaks().set(0.1, 0.2, 0.3, 0.4);
    host.add_plugin(synth).unwrap();

    let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
    listener
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let listener_url = ControlEndpoint::new(listener.local_addr().unwrap(), "/meters").url();

    let publisher = UdpPublisher::new().unwrap();
    assert!(publisher.publish(
        host.control_endpoint(),
        ControlMessage::Register { url: listener_url }
    ));

    let mut buf = [0u8; 2048];
    let peaks = wait_until_some(|| {
        let (len, _) = listener.recv_from(&mut buf).ok()?;
        let packet = ControlPacket::decode(&buf[..len]).ok()?;
        match packet.message {
            ControlMessage::Peaks { .. } => Some(packet),
            _ => None,
        }
    })
    .expect("no peaks reached the meter listener");

    assert_eq!(peaks.path, "/meters");
    assert_eq!(
        peaks.message,
        ControlMessage::Peaks {
            plugin_id: 6,
            in1: 0.1,
            in2: 0.2,
            out1: 0.3,
            out2: 0.4,
        }
    );

    publisher.publish(host.control_endpoint(), ControlMessage::Unregister);
    assert!(wait_until(|| !host.registry().meter_listener().is_attached()));
}

#[test]
fn test_remove_plugin_detaches_slot() {
    let (host, _events) = test_host();
    host.add_plugin(test_synth(7)).unwrap();

    let removed = host.remove_plugin(7).unwrap();
    assert_eq!(removed.id(), 7);
    assert!(host.registry().is_empty());
    assert!(matches!(host.close_gui(7), Err(Error::UnknownPlugin(7))));
}

fn wait_until_some<T>(mut poll: impl FnMut() -> Option<T>) -> Option<T> {
    let mut found = None;
    wait_until(|| {
        found = poll();
        found.is_some()
    });
    found
}
