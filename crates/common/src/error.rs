//! Common error types
//!
//! Failures are layered: [`TransportError`] is what the USB stack reports,
//! [`ApplyError`] is the per-device reason attached to a failed outcome, and
//! [`RunError`] covers conditions that leave a run with no outcomes at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error class reported by the host USB stack
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Host denied raw access to the device
    #[error("access denied")]
    PermissionDenied,

    /// Device disappeared while a request was in flight
    #[error("no such device")]
    NoDevice,

    /// Device or one of its interfaces is in use
    #[error("device busy")]
    Busy,

    /// Control transfer exceeded the host-enforced timeout
    #[error("timed out")]
    Timeout,

    /// Control endpoint stalled the request
    #[error("pipe stalled")]
    Stall,

    /// Operation not supported by this platform or device
    #[error("operation not supported")]
    NotSupported,

    #[error("{0}")]
    Other(String),
}

/// Reason a single device could not be brought to the desired configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Matched during locate, absent by the time it was re-resolved
    #[error("device not present")]
    DeviceVanished,

    #[error("permission denied")]
    PermissionDenied,

    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl From<TransportError> for ApplyError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::PermissionDenied => ApplyError::PermissionDenied,
            other => ApplyError::Transport(other),
        }
    }
}

/// Conditions that end a run before any device is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("no USB devices matching '{fragment}' found")]
    NoDevicesFound { fragment: String },

    #[error("failed to enumerate USB devices: {0}")]
    Enumeration(TransportError),
}
