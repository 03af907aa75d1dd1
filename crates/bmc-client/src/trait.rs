//! BmcClient trait for protocol polymorphism and mocking
//!
//! This trait abstracts the management controller so the provisioning
//! state machine never depends on a concrete protocol. The Redfish and
//! IPMI clients implement it, and tests can use mock implementations.

use crate::error::BmcError;
use crate::types::{BootDevice, PowerState};

/// Capability set of a baseboard management controller.
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime. Power commands return once the controller acknowledges the
/// command was accepted; reaching the target state is confirmed separately
/// through `power_state`.
#[async_trait::async_trait]
pub trait BmcClient: Send + Sync {
    /// Establish transport-level session state.
    ///
    /// Idempotent: calling this on an already-connected client is a no-op.
    async fn connect(&self) -> Result<(), BmcError>;

    /// Power the host on. Powering on an already-on host is a no-op.
    async fn power_on(&self) -> Result<(), BmcError>;

    /// Power the host off (forced).
    async fn power_off(&self) -> Result<(), BmcError>;

    /// Power-cycle the host.
    async fn power_cycle(&self) -> Result<(), BmcError>;

    /// Arm a one-shot boot-device override for the next boot only.
    ///
    /// The override must not persist across a subsequent boot cycle.
    async fn set_boot_device(&self, device: BootDevice) -> Result<(), BmcError>;

    /// Query the current power state.
    ///
    /// Transient query failures are retried with bounded backoff; an
    /// unrecognized but well-formed answer yields `PowerState::Unknown`.
    async fn power_state(&self) -> Result<PowerState, BmcError>;

    /// Release the underlying session.
    async fn disconnect(&self) -> Result<(), BmcError>;
}
