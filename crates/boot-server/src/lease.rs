//! Boot lease table
//!
//! A boot lease binds a MAC address to an active boot policy for the
//! duration of one provisioning job. The provisioning job that armed the
//! lease is its single writer; the DHCP/TFTP/HTTP listeners are concurrent
//! readers. This is distinct from a DHCP address lease.

use chrono::{DateTime, Utc};
use host_model::OsSpec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// An active MAC-to-boot-policy binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BootLease {
    /// Normalized MAC address
    pub mac: String,
    /// Owning hostname
    pub hostname: String,
    /// Kernel artifact name, relative to the artifact root
    pub kernel: String,
    /// Initrd artifact name, relative to the artifact root
    pub initrd: String,
    /// Full kernel command line, install-config URL included
    pub cmdline: String,
    /// Where the booting host fetches its install configuration
    pub config_url: String,
    /// OS/install specification snapshot used to render the config
    pub os: OsSpec,
    /// The lease stops answering boot requests after this instant
    pub expires_at: DateTime<Utc>,
}

impl BootLease {
    /// Whether the lease has expired.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Shared lease table, keyed by normalized MAC address.
///
/// Cheap to clone; all clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct LeaseTable {
    inner: Arc<RwLock<HashMap<String, BootLease>>>,
}

impl LeaseTable {
    /// Create an empty lease table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the lease for its MAC address.
    pub async fn insert(&self, lease: BootLease) {
        debug!(mac = %lease.mac, hostname = %lease.hostname, "installing boot lease");
        self.inner.write().await.insert(lease.mac.clone(), lease);
    }

    /// Remove the lease for a MAC address, returning it if present.
    pub async fn remove(&self, mac: &str) -> Option<BootLease> {
        let removed = self.inner.write().await.remove(mac);
        if removed.is_some() {
            debug!(mac, "removed boot lease");
        }
        removed
    }

    /// Look up the active (non-expired) lease for a MAC address.
    pub async fn lookup(&self, mac: &str) -> Option<BootLease> {
        self.inner
            .read()
            .await
            .get(mac)
            .filter(|lease| !lease.expired())
            .cloned()
    }

    /// Number of entries, expired included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use host_model::{DiskLayout, ImageSpec, OsSpec};

    fn sample_lease(mac: &str, ttl: Duration) -> BootLease {
        BootLease {
            mac: mac.to_string(),
            hostname: "h1".to_string(),
            kernel: "vmlinuz".to_string(),
            initrd: "initrd.img".to_string(),
            cmdline: "console=ttyS0".to_string(),
            config_url: format!("http://10.0.0.1:8080/v1/boot/{mac}/config"),
            os: OsSpec {
                os_type: String::new(),
                version: String::new(),
                source: String::new(),
                root_password: String::new(),
                ssh_keys: vec![],
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
                packages: vec![],
                pre_install: vec![],
                post_install: vec![],
            },
            expires_at: Utc::now() + ttl,
        }
    }

    #[tokio::test]
    async fn test_insert_lookup_remove() {
        let table = LeaseTable::new();
        let mac = "aa:bb:cc:dd:ee:01";

        assert!(table.lookup(mac).await.is_none());

        table.insert(sample_lease(mac, Duration::minutes(30))).await;
        assert_eq!(table.lookup(mac).await.unwrap().hostname, "h1");

        let removed = table.remove(mac).await;
        assert!(removed.is_some());
        assert!(table.lookup(mac).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_lease_not_returned() {
        let table = LeaseTable::new();
        let mac = "aa:bb:cc:dd:ee:02";

        table.insert(sample_lease(mac, Duration::seconds(-1))).await;
        assert!(table.lookup(mac).await.is_none());
        // Still removable for cleanup
        assert!(table.remove(mac).await.is_some());
    }

    #[tokio::test]
    async fn test_independent_macs() {
        let table = LeaseTable::new();
        table
            .insert(sample_lease("aa:bb:cc:dd:ee:01", Duration::minutes(5)))
            .await;
        table
            .insert(sample_lease("aa:bb:cc:dd:ee:02", Duration::minutes(5)))
            .await;

        table.remove("aa:bb:cc:dd:ee:01").await;
        assert!(table.lookup("aa:bb:cc:dd:ee:02").await.is_some());
    }
}
