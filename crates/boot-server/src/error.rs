//! Boot service errors

use thiserror::Error;

/// Errors raised by the network boot service
#[derive(Debug, Error)]
pub enum BootError {
    /// DHCP responder failure
    #[error("DHCP error: {0}")]
    Dhcp(String),

    /// TFTP server failure
    #[error("TFTP error: {0}")]
    Tftp(String),

    /// HTTP server failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Install-config rendering failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// Invalid service configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}
