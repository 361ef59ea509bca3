//! Centralized error type for the tether umbrella crate.
//!
//! Wraps the member crates' errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bridge: {0}")]
    Bridge(#[from] tether_plugin::BridgeError),

    #[cfg(feature = "ui")]
    #[error("UI: {0}")]
    Ui(#[from] tether_plugin_ui::UiError),

    #[error("No plugin with id {0}")]
    UnknownPlugin(i32),

    #[error("All {0} plugin slots are in use")]
    RegistryFull(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
