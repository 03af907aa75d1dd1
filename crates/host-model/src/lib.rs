//! Host Registry Data Model
//!
//! Typed models for the bare-metal host registry: host identity, BMC
//! endpoint, hardware descriptor, and the per-host OS/install specification
//! consumed by the boot policy resolver and the provisioning state machine.
//!
//! Records are supplied by the external provider registry and are treated
//! as read-only input for the lifetime of a provisioning job.

pub mod error;
pub mod host;
pub mod mac;
pub mod os;

pub use error::HostModelError;
pub use host::{BmcEndpoint, BmcProtocol, CpuInfo, DiskInfo, HardwareSpec, Host, NicInfo};
pub use mac::normalize_mac;
pub use os::{DiskLayout, ImageSpec, InterfaceSpec, OsNetwork, OsSpec, Partition};
