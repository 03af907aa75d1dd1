//! Install completion signals
//!
//! One oneshot slot per hostname. The provisioning job registers a
//! receiver before powering the host on; whoever observes the installer
//! finishing reports success or failure through the registry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

/// Registry of pending install-completion signals, keyed by hostname.
///
/// Cheap to clone; all clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct InstallSignals {
    slots: Arc<Mutex<HashMap<String, oneshot::Sender<bool>>>>,
}

impl InstallSignals {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completion slot for a hostname.
    ///
    /// Replaces any stale slot left by a previous job for the same host.
    pub async fn register(&self, hostname: &str) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().await.insert(hostname.to_string(), tx);
        rx
    }

    /// Drop the slot for a hostname, if one is still pending.
    pub async fn deregister(&self, hostname: &str) {
        if self.slots.lock().await.remove(hostname).is_some() {
            debug!(hostname, "dropped pending install signal slot");
        }
    }

    /// Report install completion for a hostname.
    ///
    /// Returns `true` when a job was waiting for the report.
    pub async fn report(&self, hostname: &str, success: bool) -> bool {
        match self.slots.lock().await.remove(hostname) {
            Some(tx) => tx.send(success).is_ok(),
            None => {
                debug!(hostname, "install report for host with no waiting job");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_delivers_to_registered_slot() {
        let signals = InstallSignals::new();
        let rx = signals.register("h1").await;

        assert!(signals.report("h1", true).await);
        assert_eq!(rx.await, Ok(true));
    }

    #[tokio::test]
    async fn test_report_without_slot_is_ignored() {
        let signals = InstallSignals::new();
        assert!(!signals.report("h1", true).await);
    }

    #[tokio::test]
    async fn test_deregister_drops_slot() {
        let signals = InstallSignals::new();
        let rx = signals.register("h1").await;
        signals.deregister("h1").await;

        assert!(!signals.report("h1", true).await);
        assert!(rx.await.is_err());
    }
}
