//! BMC Client
//!
//! A protocol-polymorphic client for baseboard management controllers,
//! exposing power control, one-shot boot-device override, and power-state
//! queries behind a single trait. Two backends are provided: Redfish
//! (HTTPS REST) and IPMI (lanplus via ipmitool).
//!
//! # Example
//!
//! ```no_run
//! use bmc_client::{BmcClient, BootDevice, RedfishClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RedfishClient::new(
//!     "10.0.0.10".to_string(),
//!     "admin".to_string(),
//!     "secret".to_string(),
//!     true,
//! )?;
//!
//! client.connect().await?;
//! client.power_off().await?;
//! client.set_boot_device(BootDevice::Network).await?;
//! client.power_on().await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Power control**: on/off/cycle, acknowledged-command semantics
//! - **Boot override**: one-shot network boot for the next boot only
//! - **State queries**: bounded retry with exponential backoff
//! - **Mocking**: `MockBmc` behind the `test-util` feature

#[path = "trait.rs"]
pub mod bmc_trait;
pub mod error;
pub mod ipmi;
#[cfg(feature = "test-util")]
pub mod mock;
pub mod redfish;
pub mod retry;
pub mod types;

pub use bmc_trait::BmcClient;
pub use error::BmcError;
pub use ipmi::IpmiClient;
#[cfg(feature = "test-util")]
pub use mock::MockBmc;
pub use redfish::RedfishClient;
pub use retry::ExponentialBackoff;
pub use types::{BootDevice, PowerState};
