//! Integration tests for the BMC client
//!
//! These tests require a reachable BMC.
//! Set BMC_ADDRESS, BMC_USERNAME and BMC_PASSWORD environment variables to
//! run them against real hardware.

use bmc_client::{BmcClient, RedfishClient};

fn credentials() -> (String, String, String) {
    let address = std::env::var("BMC_ADDRESS").expect("BMC_ADDRESS environment variable must be set");
    let username = std::env::var("BMC_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("BMC_PASSWORD").expect("BMC_PASSWORD environment variable must be set");
    (address, username, password)
}

#[tokio::test]
#[ignore] // Requires a reachable Redfish BMC
async fn test_redfish_connect() {
    let (address, username, password) = credentials();

    let client = RedfishClient::new(address, username, password, true)
        .expect("Failed to create client");

    client.connect().await.expect("Failed to connect to Redfish service");

    // Connect must be idempotent
    client.connect().await.expect("Second connect should be a no-op");

    client.disconnect().await.expect("Failed to disconnect");
}

#[tokio::test]
#[ignore]
async fn test_redfish_power_state() {
    let (address, username, password) = credentials();

    let client = RedfishClient::new(address, username, password, true)
        .expect("Failed to create client");

    let state = client.power_state().await.expect("Failed to query power state");
    println!("Power state: {state}");
}
