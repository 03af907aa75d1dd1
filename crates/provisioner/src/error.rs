//! Provisioning errors

use bmc_client::types::PowerState;
use thiserror::Error;

/// Errors raised by the provisioning state machine and job coordinator
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// BMC operation failure
    #[error("BMC error: {0}")]
    Bmc(#[from] bmc_client::BmcError),

    /// Host specification failed validation
    #[error("invalid host: {0}")]
    Host(#[from] host_model::HostModelError),

    /// Host did not reach the target power state within the deadline
    #[error("power transition to {target} timed out")]
    PowerTransitionTimeout {
        /// Power state that was never reached
        target: PowerState,
    },

    /// No install completion report arrived within the deadline
    #[error("timed out waiting for the installer to report completion")]
    InstallTimeout,

    /// The whole job exceeded its deadline
    #[error("provisioning job exceeded its deadline")]
    JobTimeout,

    /// A job is already active for this hostname
    #[error("a provisioning job is already running for {0}")]
    AlreadyRunning(String),

    /// The installer reported failure
    #[error("installer reported failure")]
    InstallFailed,

    /// The job was canceled by an operator
    #[error("job canceled")]
    Canceled,

    /// No job with the given id is known to the coordinator
    #[error("no such job")]
    NoSuchJob,
}
