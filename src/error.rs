//! Errors surfaced by the monitor to its callers

use crate::device::DeviceError;
use crate::storage::StorageError;

pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Caller misuse: invalid threshold, zero interval, bad ping target
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The monitor actor has shut down
    #[error("monitor unavailable: {0}")]
    Unavailable(String),
}

impl MonitorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MonitorError::Configuration(message.into())
    }
}
