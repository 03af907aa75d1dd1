//! Boot policy resolver
//!
//! Maps a MAC address (through the lease table) to the artifacts the boot
//! listeners need: the boot policy triple and the generated install
//! configuration. Rendering is deterministic for a fixed lease, so the
//! HTTP server regenerates on every request instead of caching.

use crate::error::BootError;
use crate::lease::{BootLease, LeaseTable};
use chrono::{Duration, Utc};
use host_model::{DiskLayout, Host, OsNetwork};
use serde::Serialize;

/// Resolved boot policy for one MAC address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootPolicy {
    /// Kernel artifact name
    pub kernel: String,
    /// Initrd artifact name
    pub initrd: String,
    /// Full kernel command line
    pub cmdline: String,
    /// Install configuration URL
    pub config_url: String,
}

/// Resolve the boot policy for a MAC address.
///
/// `None` means "no boot policy": the caller must not direct the MAC to
/// network boot. This is the safe default for unknown hardware.
pub async fn resolve(table: &LeaseTable, mac: &str) -> Option<BootPolicy> {
    let lease = table.lookup(mac).await?;
    Some(BootPolicy {
        kernel: lease.kernel,
        initrd: lease.initrd,
        cmdline: lease.cmdline,
        config_url: lease.config_url,
    })
}

/// Build the boot lease for a host, embedding the install-config URL into
/// the kernel command line.
#[must_use]
pub fn lease_for_host(host: &Host, config_base_url: &str, ttl: Duration) -> BootLease {
    let base = config_base_url.trim_end_matches('/');
    let config_url = format!("{}/v1/boot/{}/config", base, host.mac);
    let cmdline = if host.os.image.cmdline.is_empty() {
        format!("inst.config={config_url}")
    } else {
        format!("{} inst.config={config_url}", host.os.image.cmdline)
    };

    BootLease {
        mac: host.mac.clone(),
        hostname: host.hostname.clone(),
        kernel: host.os.image.kernel.clone(),
        initrd: host.os.image.initrd.clone(),
        cmdline,
        config_url,
        os: host.os.clone(),
        expires_at: Utc::now() + ttl,
    }
}

/// Versioned install configuration document served to the booting host.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstallConfig<'a> {
    version: u32,
    hostname: &'a str,
    os_type: &'a str,
    os_version: &'a str,
    source: &'a str,
    root_password: &'a str,
    ssh_keys: &'a [String],
    disk: &'a DiskLayout,
    network: &'a OsNetwork,
    packages: &'a [String],
    pre_install: &'a [String],
    post_install: &'a [String],
}

/// Render the install configuration for a lease as a YAML document.
///
/// Stable input-for-input: the same lease always renders the same bytes.
pub fn render_install_config(lease: &BootLease) -> Result<String, BootError> {
    let config = InstallConfig {
        version: 1,
        hostname: &lease.hostname,
        os_type: &lease.os.os_type,
        os_version: &lease.os.version,
        source: &lease.os.source,
        root_password: &lease.os.root_password,
        ssh_keys: &lease.os.ssh_keys,
        disk: &lease.os.disk,
        network: &lease.os.network,
        packages: &lease.os.packages,
        pre_install: &lease.os.pre_install,
        post_install: &lease.os.post_install,
    };
    Ok(serde_yaml::to_string(&config)?)
}
