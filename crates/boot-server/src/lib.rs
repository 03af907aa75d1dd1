//! Network Boot Service
//!
//! PXE boot service built on `dhcproto`, `async-tftp`, and `axum`:
//!
//! - DHCP responder that answers PXE-class requests for MAC addresses with
//!   an active boot lease, and stays silent for everything else
//! - TFTP server for the host-independent bootloader stage
//! - HTTP server for per-MAC boot policy, generated install configuration,
//!   and kernel/initrd artifacts
//!
//! All three listeners share one [`LeaseTable`]; leases are written by the
//! provisioning job that armed them and read concurrently by the listeners.

pub mod dhcp;
pub mod error;
pub mod http;
pub mod lease;
pub mod policy;
pub mod server;
pub mod tftp;

pub use error::BootError;
pub use lease::{BootLease, LeaseTable};
pub use policy::{lease_for_host, render_install_config, resolve, BootPolicy};
pub use server::{BootServer, BootServerConfig};
