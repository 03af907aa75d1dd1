//! OS installation specification
//!
//! Per-host description of what gets installed and how: boot artifacts,
//! disk layout, network configuration, package set, and pre/post install
//! scripts. The boot policy resolver embeds this into the generated
//! install configuration served to the booting host.

use serde::{Deserialize, Serialize};

/// Per-host OS/install specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsSpec {
    /// OS type (e.g. `linux`)
    #[serde(default)]
    pub os_type: String,

    /// OS version
    #[serde(default)]
    pub version: String,

    /// Installation source (ISO or repository URL)
    #[serde(default)]
    pub source: String,

    /// Hashed root password for the installed system
    #[serde(default)]
    pub root_password: String,

    /// SSH public keys authorized for root access
    #[serde(default)]
    pub ssh_keys: Vec<String>,

    /// Boot artifacts for the installer environment
    pub image: ImageSpec,

    /// Target disk layout
    pub disk: DiskLayout,

    /// Network configuration for the installed system
    #[serde(default)]
    pub network: OsNetwork,

    /// Packages to install
    #[serde(default)]
    pub packages: Vec<String>,

    /// Scripts run before installation starts
    #[serde(default)]
    pub pre_install: Vec<String>,

    /// Commands applied after installation completes
    #[serde(default)]
    pub post_install: Vec<String>,
}

/// Installer boot artifacts, relative to the boot artifact root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Kernel image name
    pub kernel: String,

    /// Initrd image name
    pub initrd: String,

    /// Base kernel command line
    #[serde(default)]
    pub cmdline: String,
}

/// Target disk layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskLayout {
    /// Device to install to (e.g. `/dev/sda`)
    pub device: String,

    /// Filesystem type (e.g. `ext4`, `xfs`)
    pub filesystem: String,

    /// Whether to use LVM
    #[serde(default)]
    pub use_lvm: bool,

    /// Partition table scheme (e.g. `gpt`, `msdos`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_scheme: Option<String>,

    /// Custom partition layout (empty means installer default)
    #[serde(default)]
    pub partitions: Vec<Partition>,
}

/// A single disk partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    /// Mount point (e.g. `/`, `/boot`, `swap`)
    pub mount_point: String,

    /// Size in MB, 0 for remaining space
    #[serde(default)]
    pub size_mb: u64,

    /// Filesystem type
    pub filesystem: String,

    /// Whether this is a boot partition
    #[serde(default)]
    pub bootable: bool,
}

/// Network configuration for the installed system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsNetwork {
    /// Network interfaces
    #[serde(default)]
    pub interfaces: Vec<InterfaceSpec>,

    /// DNS nameservers
    #[serde(default)]
    pub nameservers: Vec<String>,

    /// DNS search domains
    #[serde(default)]
    pub search_domains: Vec<String>,
}

/// A single network interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSpec {
    /// Interface name (e.g. `eth0`)
    pub name: String,

    /// Static address with prefix, empty for DHCP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Gateway, empty for none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// Whether to use DHCP
    #[serde(default)]
    pub dhcp: bool,

    /// Bring the interface up on boot
    #[serde(default = "default_true")]
    pub on_boot: bool,

    /// Use this interface for the default route
    #[serde(default)]
    pub default_route: bool,
}

fn default_true() -> bool {
    true
}
