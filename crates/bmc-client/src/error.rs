//! BMC client errors

use thiserror::Error;

/// Errors that can occur when talking to a management controller
#[derive(Debug, Error)]
pub enum BmcError {
    /// Transport or authentication failure while reaching the controller
    #[error("connection error: {0}")]
    Connection(String),

    /// The controller reported the command as invalid or impossible
    #[error("controller rejected command: {0}")]
    Rejected(String),

    /// The controller cannot honor the requested boot device
    #[error("unsupported boot device: {0}")]
    UnsupportedDevice(String),

    /// Queries kept failing past the retry budget
    #[error("controller unreachable: {0}")]
    Unreachable(String),
}
