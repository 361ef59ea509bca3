//! Error types for the plugin bridge

use std::path::PathBuf;
use thiserror::Error;

/// Setup stage of a bridged plugin, used to qualify launch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStage {
    Spawning,
    Starting,
}

impl std::fmt::Display for BridgeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeStage::Spawning => write!(f, "spawning process"),
            BridgeStage::Starting => write!(f, "waiting for process start"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid control endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to load library {path}: {reason}")]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("Bridge launch failed at {stage} stage: {binary}\n  Reason: {reason}")]
    SpawnFailed {
        binary: PathBuf,
        stage: BridgeStage,
        reason: String,
    },

    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
