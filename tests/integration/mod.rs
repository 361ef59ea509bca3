//! Integration test modules for Tether
//!
//! - host: BridgeHost lifecycle, registry, meter listener
//! - ui_roundtrip: state push, relayed changes and UI-originated traffic
//! - supervision: bridge process outcomes through the host callback

pub mod host;

#[cfg(feature = "ui")]
pub mod ui_roundtrip;

#[cfg(unix)]
pub mod supervision;
