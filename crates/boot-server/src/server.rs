//! Boot service lifecycle
//!
//! Binds the DHCP, TFTP, and HTTP listeners and runs them concurrently
//! against one shared lease table. Startup is all-or-nothing: a bind
//! failure on any listener, or a listener dying later, takes the whole
//! service down rather than leaving hosts half-bootable.

use crate::dhcp::DhcpResponder;
use crate::error::BootError;
use crate::http::{self, HttpState};
use crate::lease::LeaseTable;
use crate::tftp;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

/// Default bootloader filename handed out in DHCP replies.
pub const DEFAULT_BOOTFILE: &str = "ipxe.efi";

/// Listener addresses and content roots for the boot service.
#[derive(Debug, Clone)]
pub struct BootServerConfig {
    /// DHCP responder bind address (normally 0.0.0.0:67)
    pub dhcp_addr: SocketAddr,
    /// TFTP server bind address (normally 0.0.0.0:69)
    pub tftp_addr: SocketAddr,
    /// HTTP server bind address
    pub http_addr: SocketAddr,
    /// Address booting hosts use to reach the TFTP/HTTP listeners
    pub next_server: Ipv4Addr,
    /// Bootloader filename handed out in DHCP replies
    pub bootfile: String,
    /// Directory served over TFTP
    pub bootloader_root: PathBuf,
    /// Directory holding kernel/initrd blobs served over HTTP
    pub artifact_root: PathBuf,
}

impl BootServerConfig {
    /// Base URL booting hosts use for install-config and artifact fetches.
    #[must_use]
    pub fn config_base_url(&self) -> String {
        format!("http://{}:{}", self.next_server, self.http_addr.port())
    }
}

/// The three boot listeners plus their shared lease table.
#[derive(Debug)]
pub struct BootServer {
    config: BootServerConfig,
    leases: LeaseTable,
}

impl BootServer {
    /// Create a boot server with an empty lease table.
    #[must_use]
    pub fn new(config: BootServerConfig) -> Self {
        Self::with_leases(config, LeaseTable::new())
    }

    /// Create a boot server around an existing lease table, so the job
    /// coordinator and the listeners see the same leases.
    #[must_use]
    pub fn with_leases(config: BootServerConfig, leases: LeaseTable) -> Self {
        Self { config, leases }
    }

    /// Handle to the shared lease table.
    #[must_use]
    pub fn leases(&self) -> LeaseTable {
        self.leases.clone()
    }

    /// Bind all listeners and serve until one of them fails.
    pub async fn run(self) -> Result<(), BootError> {
        if !self.config.bootloader_root.is_dir() {
            return Err(BootError::Configuration(format!(
                "bootloader root {} is not a directory",
                self.config.bootloader_root.display()
            )));
        }
        if !self.config.artifact_root.is_dir() {
            return Err(BootError::Configuration(format!(
                "artifact root {} is not a directory",
                self.config.artifact_root.display()
            )));
        }

        // Bind the sockets we can up front so a taken port fails fast
        let dhcp = DhcpResponder::bind(
            self.config.dhcp_addr,
            self.leases.clone(),
            self.config.next_server,
            self.config.bootfile.clone(),
        )
        .await?;
        let http_listener = TcpListener::bind(self.config.http_addr)
            .await
            .map_err(|e| {
                BootError::Http(format!("failed to bind {}: {e}", self.config.http_addr))
            })?;

        info!(
            next_server = %self.config.next_server,
            bootfile = %self.config.bootfile,
            "starting network boot service"
        );

        let http_state = HttpState {
            leases: self.leases.clone(),
            artifact_root: self.config.artifact_root.clone(),
        };

        tokio::try_join!(
            dhcp.serve(),
            tftp::serve(self.config.tftp_addr, self.config.bootloader_root.clone()),
            http::serve(http_listener, http_state),
        )?;

        Ok(())
    }
}
