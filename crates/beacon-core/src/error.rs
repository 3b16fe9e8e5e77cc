//! Error types for the beacon agent
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for beacon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the beacon agent
#[derive(Error, Debug)]
pub enum Error {
    /// No non-loopback hardware address was found to derive a serial from
    #[error("No hardware address available to derive a device serial")]
    NoHardwareIdentity,

    /// Unregister was attempted before any serial was established
    #[error("Device has never been discovered (no serial)")]
    NotDiscovered,

    /// OS interface enumeration failed
    #[error("Interface enumeration failed: {0}")]
    Enumeration(String),

    /// Transport-level failure talking to the directory (connect, timeout)
    #[error("Directory transport error: {0}")]
    Transport(String),

    /// The directory answered with a non-success status
    #[error("Directory rejected {action} with status {status}")]
    Rejected {
        /// Wire action that was rejected
        action: String,
        /// HTTP status code
        status: u16,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Socket-level errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a rejection error
    pub fn rejected(action: impl Into<String>, status: u16) -> Self {
        Self::Rejected {
            action: action.into(),
            status,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error came from talking to the directory service
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected { .. })
    }
}
