use std::time::Duration;

use thiserror::Error;

/// Failure reported by a device while connecting or reading.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("no frame within {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("device disconnected")]
    Disconnected,
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("bad frame: {0}")]
    Frame(String),
}

/// Errors of the frame acquisition pipeline. Every message names the
/// operation that failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("{operation}: no device matches {selector}")]
    DeviceUnavailable {
        operation: &'static str,
        selector: String,
    },
    #[error("{operation}: could not connect to {device}: {reason}")]
    ConnectionFailed {
        operation: &'static str,
        device: String,
        reason: String,
    },
    #[error("{operation}: stream terminated: {reason}")]
    StreamTerminated {
        operation: &'static str,
        reason: String,
    },
    #[error("{operation}: pipeline is not open")]
    NotOpen { operation: &'static str },
    #[error("{operation}: pipeline is already open")]
    AlreadyOpen { operation: &'static str },
    #[error("{operation}: failed to read a frame: {source}")]
    ReadFailed {
        operation: &'static str,
        source: DeviceError,
    },
    #[error("{operation}: expected {expected}, got {found}")]
    DimensionMismatch {
        operation: &'static str,
        expected: String,
        found: String,
    },
}
