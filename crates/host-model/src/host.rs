//! Host records
//!
//! A `Host` ties together the identity (hostname, MAC), the out-of-band
//! management endpoint, an informational hardware descriptor, and the OS
//! install specification.

use crate::error::HostModelError;
use crate::mac::normalize_mac;
use crate::os::OsSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A bare-metal host as supplied by the provider registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    /// Hostname, unique within the registry
    pub hostname: String,

    /// MAC address used for network boot
    pub mac: String,

    /// Out-of-band management endpoint
    pub bmc: BmcEndpoint,

    /// Hardware descriptor, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareSpec>,

    /// OS/install specification
    pub os: OsSpec,
}

impl Host {
    /// Validate the record and normalize its MAC address.
    ///
    /// Returns the host with a canonical lowercase MAC on success.
    pub fn validated(mut self) -> Result<Self, HostModelError> {
        if self.hostname.is_empty() {
            return Err(HostModelError::InvalidHost("hostname is required".into()));
        }
        if self.bmc.address.is_empty() {
            return Err(HostModelError::InvalidHost(format!(
                "host {}: BMC address is required",
                self.hostname
            )));
        }
        if self.os.image.kernel.is_empty() || self.os.image.initrd.is_empty() {
            return Err(HostModelError::InvalidHost(format!(
                "host {}: kernel and initrd image names are required",
                self.hostname
            )));
        }
        self.mac = normalize_mac(&self.mac)?;
        Ok(self)
    }
}

/// BMC endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmcEndpoint {
    /// IP address or hostname of the management controller
    pub address: String,

    /// Management protocol
    pub protocol: BmcProtocol,

    /// Username
    pub username: String,

    /// Password
    pub password: String,

    /// Skip TLS verification for Redfish endpoints
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

/// Out-of-band management protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmcProtocol {
    /// IPMI over LAN
    Ipmi,
    /// DMTF Redfish over HTTPS
    Redfish,
}

impl fmt::Display for BmcProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmcProtocol::Ipmi => write!(f, "ipmi"),
            BmcProtocol::Redfish => write!(f, "redfish"),
        }
    }
}

impl FromStr for BmcProtocol {
    type Err = HostModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ipmi" => Ok(BmcProtocol::Ipmi),
            "redfish" => Ok(BmcProtocol::Redfish),
            other => Err(HostModelError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Informational hardware descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareSpec {
    /// CPU information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuInfo>,

    /// Memory in MB
    #[serde(default)]
    pub memory_mb: u64,

    /// Disks
    #[serde(default)]
    pub disks: Vec<DiskInfo>,

    /// Network interfaces
    #[serde(default)]
    pub nics: Vec<NicInfo>,
}

/// CPU description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuInfo {
    /// Vendor string
    #[serde(default)]
    pub vendor: String,
    /// Model string
    #[serde(default)]
    pub model: String,
    /// Physical cores
    #[serde(default)]
    pub cores: u32,
    /// Hardware threads
    #[serde(default)]
    pub threads: u32,
}

/// Disk description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfo {
    /// Device path
    pub device: String,
    /// Size in GB
    #[serde(default)]
    pub size_gb: u64,
    /// Model string
    #[serde(default)]
    pub model: String,
}

/// NIC description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicInfo {
    /// Interface name
    pub name: String,
    /// MAC address
    #[serde(default)]
    pub mac: String,
    /// Link speed in Mbps
    #[serde(default)]
    pub speed_mbps: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::{DiskLayout, ImageSpec};

    fn sample_host() -> Host {
        Host {
            hostname: "h1".to_string(),
            mac: "AA:BB:CC:DD:EE:01".to_string(),
            bmc: BmcEndpoint {
                address: "10.0.0.10".to_string(),
                protocol: BmcProtocol::Redfish,
                username: "admin".to_string(),
                password: "secret".to_string(),
                insecure_skip_verify: true,
            },
            hardware: None,
            os: OsSpec {
                os_type: "linux".to_string(),
                version: "24.04".to_string(),
                source: String::new(),
                root_password: String::new(),
                ssh_keys: vec!["ssh-ed25519 AAAAC3Nza ops@example".to_string()],
                image: ImageSpec {
                    kernel: "vmlinuz".to_string(),
                    initrd: "initrd.img".to_string(),
                    cmdline: "console=ttyS0".to_string(),
                },
                disk: DiskLayout {
                    device: "/dev/sda".to_string(),
                    filesystem: "ext4".to_string(),
                    use_lvm: false,
                    partition_scheme: None,
                    partitions: vec![],
                },
                network: Default::default(),
                packages: vec!["openssh-server".to_string()],
                pre_install: vec![],
                post_install: vec![],
            },
        }
    }

    #[test]
    fn test_validated_normalizes_mac() {
        let host = sample_host().validated().unwrap();
        assert_eq!(host.mac, "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn test_validated_rejects_missing_fields() {
        let mut host = sample_host();
        host.hostname.clear();
        assert!(host.validated().is_err());

        let mut host = sample_host();
        host.bmc.address.clear();
        assert!(host.validated().is_err());

        let mut host = sample_host();
        host.os.image.kernel.clear();
        assert!(host.validated().is_err());
    }

    #[test]
    fn test_protocol_round_trip() {
        assert_eq!("redfish".parse::<BmcProtocol>().unwrap(), BmcProtocol::Redfish);
        assert_eq!("IPMI".parse::<BmcProtocol>().unwrap(), BmcProtocol::Ipmi);
        assert!("snmp".parse::<BmcProtocol>().is_err());
        assert_eq!(BmcProtocol::Redfish.to_string(), "redfish");
    }

    #[test]
    fn test_host_json_round_trip() {
        let host = sample_host();
        let json = serde_json::to_string(&host).unwrap();
        let back: Host = serde_json::from_str(&json).unwrap();
        assert_eq!(host, back);
    }
}
