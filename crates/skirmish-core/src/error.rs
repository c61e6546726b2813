//! Error types for the tactical core.
//!
//! Two families exist:
//! - [`TransportError`]: anything the remote unit client can fail with. These
//!   never escape a tick; the orchestrator turns them into a full entity reset.
//! - [`CoreError`]: lifecycle and configuration failures surfaced to whoever
//!   owns the [`TacticalCore`](crate::runtime::TacticalCore).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias for remote calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result alias for lifecycle operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failure talking to the game process.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect, read or write failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote process did not answer within the fixed timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The request could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response was not valid JSON or did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The connection closed before any response bytes arrived.
    #[error("connection closed without a response")]
    EmptyResponse,

    /// The response answered a different request.
    #[error("response correlation mismatch: sent {expected}, got {received}")]
    CorrelationMismatch {
        /// Request id we sent.
        expected: String,
        /// Request id the response carried.
        received: String,
    },

    /// The remote process reported a failure (`status < 0`).
    #[error("remote rejected request ({code}): {message}")]
    Rejected {
        /// Remote error code.
        code: String,
        /// Remote error message.
        message: String,
    },
}

impl TransportError {
    /// Returns true if this error means the remote process was unreachable or
    /// too slow, as opposed to answering with something unusable.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout(_) | Self::EmptyResponse)
    }
}

/// Lifecycle and configuration failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The loop thread could not be spawned.
    #[error("failed to spawn tick loop thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// An operation needed the loop but it is not running.
    #[error("tick loop is not running")]
    NotRunning,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A configuration file could not be read or parsed.
    #[error("failed to load config file '{path}': {message}")]
    ConfigFile {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}
