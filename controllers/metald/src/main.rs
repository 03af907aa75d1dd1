//! Bare-metal provisioning daemon
//!
//! Runs the network boot service (DHCP responder, TFTP bootloader server,
//! HTTP config/artifact server). Configuration comes from environment
//! variables; addresses fall back to the standard boot-service ports.

use anyhow::{Context, Result};
use boot_server::server::{BootServer, BootServerConfig, DEFAULT_BOOTFILE};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env_or(key, default);
    raw.parse()
        .with_context(|| format!("invalid {key}: {raw}"))
}

fn config_from_env() -> Result<BootServerConfig> {
    Ok(BootServerConfig {
        dhcp_addr: env_parse::<SocketAddr>("METALD_DHCP_ADDR", "0.0.0.0:67")?,
        tftp_addr: env_parse::<SocketAddr>("METALD_TFTP_ADDR", "0.0.0.0:69")?,
        http_addr: env_parse::<SocketAddr>("METALD_HTTP_ADDR", "0.0.0.0:8080")?,
        next_server: env_parse::<Ipv4Addr>("METALD_NEXT_SERVER", "0.0.0.0")
            .context("METALD_NEXT_SERVER must be the address booting hosts can reach")?,
        bootfile: env_or("METALD_BOOTFILE", DEFAULT_BOOTFILE),
        bootloader_root: PathBuf::from(env_or("METALD_BOOTLOADER_ROOT", "/var/lib/metald/tftp")),
        artifact_root: PathBuf::from(env_or("METALD_ARTIFACT_ROOT", "/var/lib/metald/artifacts")),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting bare-metal provisioning daemon");

    let config = config_from_env()?;
    let server = BootServer::new(config);

    // Job control (provisioner::JobCoordinator over server.leases()) is a
    // library surface consumed by the external API layer, not this daemon
    server.run().await.context("network boot service failed")?;
    Ok(())
}
