//! Mock BMC for unit testing
//!
//! In-memory implementation of `BmcClient` with scripted failure modes,
//! used by the provisioner tests to exercise the state machine without
//! hardware.

#![allow(clippy::unwrap_used, reason = "test utility, poisoned lock is a test bug")]

use crate::bmc_trait::BmcClient;
use crate::error::BmcError;
use crate::types::{BootDevice, PowerState};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct MockState {
    power: PowerState,
    connected: bool,
    // One-shot override, consumed by the next power-on
    boot_override: Option<BootDevice>,
    default_boot: BootDevice,
    // Boot source used by each simulated boot, in order
    boot_sources: Vec<BootDevice>,
    unreachable: bool,
    reject_boot_device: bool,
    fail_connect: bool,
    // Chassis ignores power-off commands (stuck host)
    hold_power: bool,
    calls: Vec<String>,
}

/// Mock BMC client for testing
///
/// Tracks power state and the one-shot boot override in memory, and can be
/// scripted to fail in the ways the real controllers do.
#[derive(Debug, Clone)]
pub struct MockBmc {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBmc {
    fn default() -> Self {
        Self::new(PowerState::On)
    }
}

impl MockBmc {
    /// Create a mock starting in the given power state.
    #[must_use]
    pub fn new(power: PowerState) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                power,
                connected: false,
                boot_override: None,
                default_boot: BootDevice::Disk,
                boot_sources: Vec::new(),
                unreachable: false,
                reject_boot_device: false,
                fail_connect: false,
                hold_power: false,
                calls: Vec::new(),
            })),
        }
    }

    /// Make every power-state query fail as unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// Make boot-device overrides fail with `UnsupportedDevice`.
    pub fn set_reject_boot_device(&self, reject: bool) {
        self.state.lock().unwrap().reject_boot_device = reject;
    }

    /// Make `connect` fail with `Connection`.
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    /// Make the chassis ignore power-off commands.
    pub fn set_hold_power(&self, hold: bool) {
        self.state.lock().unwrap().hold_power = hold;
    }

    /// Current power state, for assertions.
    #[must_use]
    pub fn current_power(&self) -> PowerState {
        self.state.lock().unwrap().power
    }

    /// Whether a one-shot override is currently armed.
    #[must_use]
    pub fn override_armed(&self) -> bool {
        self.state.lock().unwrap().boot_override.is_some()
    }

    /// Boot source consumed by each simulated boot, in order.
    #[must_use]
    pub fn boot_sources(&self) -> Vec<BootDevice> {
        self.state.lock().unwrap().boot_sources.clone()
    }

    /// Whether the session is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    /// Recorded call names, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait::async_trait]
impl BmcClient for MockBmc {
    async fn connect(&self) -> Result<(), BmcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("connect".to_string());
        if state.fail_connect {
            return Err(BmcError::Connection("mock connect failure".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    async fn power_on(&self) -> Result<(), BmcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("power_on".to_string());
        state.power = PowerState::On;
        // The firmware consumes the one-shot override on this boot
        let source = state.boot_override.take().unwrap_or(state.default_boot);
        state.boot_sources.push(source);
        Ok(())
    }

    async fn power_off(&self) -> Result<(), BmcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("power_off".to_string());
        if !state.hold_power {
            state.power = PowerState::Off;
        }
        Ok(())
    }

    async fn power_cycle(&self) -> Result<(), BmcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("power_cycle".to_string());
        state.power = PowerState::On;
        let source = state.boot_override.take().unwrap_or(state.default_boot);
        state.boot_sources.push(source);
        Ok(())
    }

    async fn set_boot_device(&self, device: BootDevice) -> Result<(), BmcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set_boot_device:{device}"));
        if state.reject_boot_device {
            return Err(BmcError::UnsupportedDevice(device.to_string()));
        }
        state.boot_override = Some(device);
        Ok(())
    }

    async fn power_state(&self) -> Result<PowerState, BmcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("power_state".to_string());
        if state.unreachable {
            return Err(BmcError::Unreachable("mock unreachable".to_string()));
        }
        Ok(state.power)
    }

    async fn disconnect(&self) -> Result<(), BmcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("disconnect".to_string());
        state.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_shot_override_does_not_persist() {
        let bmc = MockBmc::new(PowerState::Off);

        bmc.set_boot_device(BootDevice::Network).await.unwrap();
        assert!(bmc.override_armed());

        // First boot consumes the override
        bmc.power_on().await.unwrap();
        assert!(!bmc.override_armed());

        // Second (natural) boot falls back to the default device
        bmc.power_off().await.unwrap();
        bmc.power_on().await.unwrap();

        assert_eq!(
            bmc.boot_sources(),
            vec![BootDevice::Network, BootDevice::Disk]
        );
    }

    #[tokio::test]
    async fn test_scripted_unreachable() {
        let bmc = MockBmc::new(PowerState::On);
        bmc.set_unreachable(true);
        assert!(matches!(
            bmc.power_state().await,
            Err(BmcError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_disconnect_tracking() {
        let bmc = MockBmc::new(PowerState::Off);
        bmc.connect().await.unwrap();
        assert!(bmc.is_connected());
        bmc.disconnect().await.unwrap();
        assert!(!bmc.is_connected());
    }
}
