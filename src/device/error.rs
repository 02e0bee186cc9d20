//! Error types for device operations

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result type alias for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors a device client can return
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    /// Connection could not be established
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// Credentials were rejected
    #[error("authentication rejected by device")]
    AuthenticationFailed,

    /// The device answered with something we could not decode
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No answer within the call budget
    #[error("device did not respond within {0:?}")]
    Timeout(Duration),

    /// The device (or this client) does not offer the requested capability
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The device understood the command but refused it
    #[error("device rejected command: {0}")]
    CommandFailed(String),
}

/// Coarse classification of a [`DeviceError`], used in snapshot error markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceErrorKind {
    Unreachable,
    AuthenticationFailed,
    MalformedResponse,
    Timeout,
    Unavailable,
    CommandFailed,
}

impl DeviceError {
    pub fn kind(&self) -> DeviceErrorKind {
        match self {
            DeviceError::Unreachable(_) => DeviceErrorKind::Unreachable,
            DeviceError::AuthenticationFailed => DeviceErrorKind::AuthenticationFailed,
            DeviceError::MalformedResponse(_) => DeviceErrorKind::MalformedResponse,
            DeviceError::Timeout(_) => DeviceErrorKind::Timeout,
            DeviceError::Unavailable(_) => DeviceErrorKind::Unavailable,
            DeviceError::CommandFailed(_) => DeviceErrorKind::CommandFailed,
        }
    }
}

impl std::fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DeviceErrorKind::Unreachable => "unreachable",
            DeviceErrorKind::AuthenticationFailed => "authentication_failed",
            DeviceErrorKind::MalformedResponse => "malformed_response",
            DeviceErrorKind::Timeout => "timeout",
            DeviceErrorKind::Unavailable => "unavailable",
            DeviceErrorKind::CommandFailed => "command_failed",
        };
        f.write_str(text)
    }
}
