//! Redfish BMC client
//!
//! Implements the BMC capability set against a DMTF Redfish service.
//! The client discovers the first `ComputerSystem` under
//! `/redfish/v1/Systems` at connect time and issues reset actions and boot
//! override patches against it.

use crate::bmc_trait::BmcClient;
use crate::error::BmcError;
use crate::retry::{query_with_retries, QUERY_INITIAL_DELAY, QUERY_RETRY_BUDGET};
use crate::types::{BootDevice, PowerState};
use host_model::BmcEndpoint;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Transport timeout for Redfish requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Redfish API client for one host.
#[derive(Debug)]
pub struct RedfishClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    // Resolved ComputerSystem path, present while connected
    system_path: Mutex<Option<String>>,
}

impl RedfishClient {
    /// Create a new Redfish client.
    ///
    /// # Arguments
    /// * `address` - BMC address (host or host:port, without scheme)
    /// * `username` / `password` - BMC credentials
    /// * `insecure` - skip TLS verification (BMCs commonly ship self-signed certs)
    pub fn new(
        address: String,
        username: String,
        password: String,
        insecure: bool,
    ) -> Result<Self, BmcError> {
        let client = Client::builder()
            .timeout(CONNECT_TIMEOUT)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| BmcError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("https://{}", address.trim_end_matches('/')),
            username,
            password,
            system_path: Mutex::new(None),
        })
    }

    /// Create a client from a host registry BMC endpoint.
    pub fn from_endpoint(endpoint: &BmcEndpoint) -> Result<Self, BmcError> {
        Self::new(
            endpoint.address.clone(),
            endpoint.username.clone(),
            endpoint.password.clone(),
            endpoint.insecure_skip_verify,
        )
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, BmcError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| BmcError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BmcError::Connection(format!(
                "authentication failed: {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BmcError::Connection(format!(
                "GET {path} failed: {status} - {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BmcError::Connection(e.to_string()))
    }

    /// Resolve the ComputerSystem path, connecting if necessary.
    async fn ensure_system(&self) -> Result<String, BmcError> {
        self.connect().await?;
        let guard = self.system_path.lock().await;
        guard
            .clone()
            .ok_or_else(|| BmcError::Connection("no Redfish session".to_string()))
    }

    async fn reset(&self, reset_type: &str) -> Result<(), BmcError> {
        let system = self.ensure_system().await?;
        let url = format!("{}{}/Actions/ComputerSystem.Reset", self.base_url, system);
        debug!(reset_type, "issuing Redfish reset");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "ResetType": reset_type }))
            .send()
            .await
            .map_err(|e| BmcError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // Controllers answer 400/409 for transitions into the current state
        // (e.g. power-on while on). Treat those as a no-op.
        if status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT {
            let current = self.query_power_state_once().await.unwrap_or(PowerState::Unknown);
            let already_there = matches!(
                (reset_type, current),
                ("On", PowerState::On) | ("ForceOff", PowerState::Off)
            );
            if already_there {
                debug!(reset_type, "host already in target state");
                return Ok(());
            }
        }

        let body = response.text().await.unwrap_or_default();
        Err(BmcError::Rejected(format!(
            "reset {reset_type} failed: {status} - {body}"
        )))
    }

    async fn query_power_state_once(&self) -> Result<PowerState, BmcError> {
        let system = self.ensure_system().await?;
        let body = self.get_json(&system).await?;

        Ok(match body.get("PowerState").and_then(|v| v.as_str()) {
            Some("On") => PowerState::On,
            Some("Off") => PowerState::Off,
            _ => PowerState::Unknown,
        })
    }
}

#[async_trait::async_trait]
impl BmcClient for RedfishClient {
    async fn connect(&self) -> Result<(), BmcError> {
        let mut guard = self.system_path.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        debug!(base_url = %self.base_url, "connecting to Redfish service");
        drop(guard);

        let systems = self.get_json("/redfish/v1/Systems").await?;
        let first = systems
            .get("Members")
            .and_then(|m| m.as_array())
            .and_then(|members| members.first())
            .and_then(|member| member.get("@odata.id"))
            .and_then(|id| id.as_str())
            .ok_or_else(|| BmcError::Connection("no systems found".to_string()))?
            .to_string();

        let mut guard = self.system_path.lock().await;
        *guard = Some(first);
        Ok(())
    }

    async fn power_on(&self) -> Result<(), BmcError> {
        self.reset("On").await
    }

    async fn power_off(&self) -> Result<(), BmcError> {
        self.reset("ForceOff").await
    }

    async fn power_cycle(&self) -> Result<(), BmcError> {
        self.reset("ForceRestart").await
    }

    async fn set_boot_device(&self, device: BootDevice) -> Result<(), BmcError> {
        let target = match device {
            BootDevice::Network => "Pxe",
            BootDevice::Disk => "Hdd",
        };
        let system = self.ensure_system().await?;
        let url = format!("{}{}", self.base_url, system);
        debug!(target, "arming one-shot boot override");

        let response = self
            .client
            .patch(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "Boot": {
                    "BootSourceOverrideTarget": target,
                    "BootSourceOverrideEnabled": "Once",
                }
            }))
            .send()
            .await
            .map_err(|e| BmcError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST {
            return Err(BmcError::UnsupportedDevice(format!(
                "{device}: {status} - {body}"
            )));
        }
        Err(BmcError::Rejected(format!(
            "boot override failed: {status} - {body}"
        )))
    }

    async fn power_state(&self) -> Result<PowerState, BmcError> {
        query_with_retries(QUERY_RETRY_BUDGET, QUERY_INITIAL_DELAY, || {
            self.query_power_state_once()
        })
        .await
    }

    async fn disconnect(&self) -> Result<(), BmcError> {
        let mut guard = self.system_path.lock().await;
        *guard = None;
        Ok(())
    }
}
