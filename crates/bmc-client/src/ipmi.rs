//! IPMI BMC client
//!
//! Drives `ipmitool -I lanplus` as the transport. The chassis command set
//! maps directly onto the BMC capability set, and `chassis bootdev` is
//! next-boot-only by default, which gives the one-shot override semantics
//! without extra bookkeeping. The password travels through the
//! `IPMI_PASSWORD` environment variable (`-E`), never argv.

use crate::bmc_trait::BmcClient;
use crate::error::BmcError;
use crate::retry::{query_with_retries, QUERY_INITIAL_DELAY, QUERY_RETRY_BUDGET};
use crate::types::{BootDevice, PowerState};
use host_model::BmcEndpoint;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// IPMI-over-LAN client for one host.
#[derive(Debug)]
pub struct IpmiClient {
    address: String,
    username: String,
    password: String,
    connected: Mutex<bool>,
}

impl IpmiClient {
    /// Create a new IPMI client.
    pub fn new(address: String, username: String, password: String) -> Self {
        Self {
            address,
            username,
            password,
            connected: Mutex::new(false),
        }
    }

    /// Create a client from a host registry BMC endpoint.
    pub fn from_endpoint(endpoint: &BmcEndpoint) -> Self {
        Self::new(
            endpoint.address.clone(),
            endpoint.username.clone(),
            endpoint.password.clone(),
        )
    }

    async fn run_chassis(&self, args: &[&str]) -> Result<String, BmcError> {
        let output = Command::new("ipmitool")
            .args(["-I", "lanplus", "-H", &self.address, "-U", &self.username, "-E"])
            .env("IPMI_PASSWORD", &self.password)
            .args(args)
            .output()
            .await
            .map_err(|e| BmcError::Connection(format!("failed to run ipmitool: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            return Ok(stdout);
        }

        // Session-level failures come back on stderr before any command runs
        if stderr.contains("Unable to establish") || stderr.contains("Authentication") {
            return Err(BmcError::Connection(stderr));
        }
        Err(BmcError::Rejected(if stderr.is_empty() {
            stdout
        } else {
            stderr
        }))
    }

    async fn query_power_state_once(&self) -> Result<PowerState, BmcError> {
        let stdout = self.run_chassis(&["chassis", "power", "status"]).await?;
        let lowered = stdout.to_ascii_lowercase();
        Ok(if lowered.contains("is on") {
            PowerState::On
        } else if lowered.contains("is off") {
            PowerState::Off
        } else {
            PowerState::Unknown
        })
    }
}

#[async_trait::async_trait]
impl BmcClient for IpmiClient {
    async fn connect(&self) -> Result<(), BmcError> {
        let mut guard = self.connected.lock().await;
        if *guard {
            return Ok(());
        }

        debug!(address = %self.address, "establishing IPMI session");
        // A status query both validates credentials and proves reachability
        self.run_chassis(&["chassis", "power", "status"])
            .await
            .map_err(|e| BmcError::Connection(e.to_string()))?;

        *guard = true;
        Ok(())
    }

    async fn power_on(&self) -> Result<(), BmcError> {
        self.connect().await?;
        // ipmitool reports success for power-on of an already-on chassis
        self.run_chassis(&["chassis", "power", "on"]).await.map(|_| ())
    }

    async fn power_off(&self) -> Result<(), BmcError> {
        self.connect().await?;
        self.run_chassis(&["chassis", "power", "off"]).await.map(|_| ())
    }

    async fn power_cycle(&self) -> Result<(), BmcError> {
        self.connect().await?;
        self.run_chassis(&["chassis", "power", "cycle"]).await.map(|_| ())
    }

    async fn set_boot_device(&self, device: BootDevice) -> Result<(), BmcError> {
        self.connect().await?;
        let bootdev = match device {
            BootDevice::Network => "pxe",
            BootDevice::Disk => "disk",
        };
        debug!(bootdev, "arming one-shot boot override");

        self.run_chassis(&["chassis", "bootdev", bootdev])
            .await
            .map(|_| ())
            .map_err(|e| match e {
                BmcError::Rejected(msg) if msg.to_ascii_lowercase().contains("invalid") => {
                    BmcError::UnsupportedDevice(format!("{device}: {msg}"))
                }
                other => other,
            })
    }

    async fn power_state(&self) -> Result<PowerState, BmcError> {
        query_with_retries(QUERY_RETRY_BUDGET, QUERY_INITIAL_DELAY, || {
            self.query_power_state_once()
        })
        .await
    }

    async fn disconnect(&self) -> Result<(), BmcError> {
        let mut guard = self.connected.lock().await;
        *guard = false;
        Ok(())
    }
}
