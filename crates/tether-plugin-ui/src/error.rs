use tether_plugin::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UiError {
    #[error("UI initialization failed: {0}")]
    InitFailed(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UiError>;
