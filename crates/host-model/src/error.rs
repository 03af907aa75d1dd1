//! Host model errors

use thiserror::Error;

/// Errors raised while validating host registry records
#[derive(Debug, Error)]
pub enum HostModelError {
    /// MAC address is not of the form `aa:bb:cc:dd:ee:ff`
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    /// A required field is empty or missing
    #[error("invalid host record: {0}")]
    InvalidHost(String),

    /// Unknown BMC protocol name
    #[error("unsupported BMC protocol: {0}")]
    UnsupportedProtocol(String),
}
