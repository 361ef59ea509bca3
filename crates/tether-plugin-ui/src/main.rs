//! Headless UI bridge. Spawned by the host in place of a toolkit UI.
//!
//! Args: `<control url> [...] <window title>`; the fields in between depend on
//! the bridge mode and are only logged.

use std::env;
use tether_plugin::BridgeConfig;
use tether_plugin_ui::{
    ControlReceiver, HeadlessUi, HeadlessWindow, HostLink, Result, UiSession, UI_TICK,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let control_url = args
        .first()
        .expect("Control URL required as first argument");
    let title = match args.last() {
        Some(last) if args.len() > 1 => last.clone(),
        _ => "Plugin (GUI)".to_string(),
    };
    tracing::debug!("UI bridge args: {:?}", args);

    let host = HostLink::connect(control_url)?;
    let mut session = UiSession::from_config(
        HeadlessUi::new(title),
        HeadlessWindow::default(),
        &BridgeConfig::default(),
    );

    let receiver = ControlReceiver::bind(
        "127.0.0.1:0".parse().expect("valid loopback address"),
        "/ui",
        session.queue(),
    )?;
    tracing::info!("UI bridge listening at {}", receiver.url());

    session = session.with_host(host, receiver.url());
    session.run(UI_TICK)?;

    tracing::info!("UI bridge shutting down");
    Ok(())
}
