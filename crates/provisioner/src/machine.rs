//! Provisioning state machine
//!
//! Drives one host through a reinstall: force it off, arm a one-shot
//! network boot with a fresh boot lease, power it on, wait for the
//! installer to report back, then run post-install commands. Every exit
//! path, success, failure, cancel, or deadline, releases the boot lease
//! and the BMC session.

use crate::error::ProvisionError;
use crate::job::{JobPhase, JobStatus};
use bmc_client::types::{BootDevice, PowerState};
use bmc_client::BmcClient;
use boot_server::{lease_for_host, LeaseTable};
use chrono::Utc;
use host_model::Host;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time;
use tracing::{info, warn};

/// Default deadline for a whole provisioning job.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default interval between power-state polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Deadlines and polling cadence for a provisioning job.
///
/// The per-phase deadlines are optional: unset, a slow phase is only
/// bounded by the job deadline.
#[derive(Debug, Clone)]
pub struct JobTimings {
    /// Deadline for the whole job
    pub job_timeout: Duration,
    /// Interval between power-state polls
    pub poll_interval: Duration,
    /// Optional deadline for reaching a commanded power state
    pub power_deadline: Option<Duration>,
    /// Optional deadline for the install-completion report
    pub install_deadline: Option<Duration>,
}

impl Default for JobTimings {
    fn default() -> Self {
        Self {
            job_timeout: DEFAULT_JOB_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            power_deadline: None,
            install_deadline: None,
        }
    }
}

/// Runs a host's post-install commands.
///
/// Pluggable so deployments can execute over SSH, a config-management
/// hook, or anything else; failures are collected into a warning rather
/// than failing the job.
#[async_trait::async_trait]
pub trait PostInstallRunner: Send + Sync {
    /// Run one post-install command on the freshly installed host.
    async fn run(&self, hostname: &str, command: &str) -> anyhow::Result<()>;
}

/// Default runner: logs each command without executing anything.
///
/// Stands in until a deployment wires up a real execution transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPostInstallRunner;

#[async_trait::async_trait]
impl PostInstallRunner for LoggingPostInstallRunner {
    async fn run(&self, hostname: &str, command: &str) -> anyhow::Result<()> {
        info!(hostname, command, "post-install command (no execution transport configured)");
        Ok(())
    }
}

/// One provisioning job's state machine.
pub(crate) struct StateMachine {
    pub(crate) host: Host,
    pub(crate) bmc: Arc<dyn BmcClient>,
    pub(crate) leases: LeaseTable,
    pub(crate) config_base_url: String,
    pub(crate) timings: JobTimings,
    pub(crate) status: watch::Sender<JobStatus>,
    pub(crate) post_install: Arc<dyn PostInstallRunner>,
}

impl StateMachine {
    /// Run the job to a terminal phase.
    ///
    /// Never returns an error: the outcome is published on the status
    /// channel, and cleanup runs on every exit path.
    pub(crate) async fn run(
        self,
        install_rx: oneshot::Receiver<bool>,
        cancel_rx: oneshot::Receiver<()>,
    ) {
        let result = tokio::select! {
            res = time::timeout(self.timings.job_timeout, self.drive(install_rx)) => {
                res.unwrap_or(Err(ProvisionError::JobTimeout))
            }
            _ = cancel_rx => Err(ProvisionError::Canceled),
        };

        self.cleanup().await;

        match result {
            Ok(warning) => {
                info!(hostname = %self.host.hostname, "provisioning succeeded");
                self.status.send_modify(|status| {
                    status.phase = JobPhase::Succeeded;
                    status.warning = warning;
                    status.updated_at = Utc::now();
                });
            }
            Err(err) => {
                warn!(hostname = %self.host.hostname, error = %err, "provisioning failed");
                self.status.send_modify(|status| {
                    status.failed_phase = Some(status.phase);
                    status.phase = JobPhase::Failed;
                    status.error = Some(err.to_string());
                    status.updated_at = Utc::now();
                });
            }
        }
    }

    /// Phase sequence. Any error here fails the job at the current phase.
    async fn drive(
        &self,
        install_rx: oneshot::Receiver<bool>,
    ) -> Result<Option<String>, ProvisionError> {
        info!(hostname = %self.host.hostname, mac = %self.host.mac, "starting provisioning job");
        self.bmc.connect().await?;

        self.set_phase(JobPhase::PoweringOff);
        self.bmc.power_off().await?;
        self.wait_for_power(PowerState::Off).await?;

        self.set_phase(JobPhase::ArmingBoot);
        let lease = lease_for_host(&self.host, &self.config_base_url, self.lease_ttl());
        self.leases.insert(lease).await;
        self.bmc.set_boot_device(BootDevice::Network).await?;

        self.set_phase(JobPhase::PoweringOn);
        self.bmc.power_on().await?;

        self.set_phase(JobPhase::AwaitingInstall);
        self.await_install(install_rx).await?;
        // The host boots from disk from here on; stop answering PXE for it
        self.leases.remove(&self.host.mac).await;

        self.set_phase(JobPhase::PostInstall);
        Ok(self.run_post_install().await)
    }

    /// Poll until the chassis reports the target power state.
    async fn wait_for_power(&self, target: PowerState) -> Result<(), ProvisionError> {
        let poll = async {
            loop {
                if self.bmc.power_state().await? == target {
                    return Ok::<(), ProvisionError>(());
                }
                time::sleep(self.timings.poll_interval).await;
            }
        };

        match self.timings.power_deadline {
            Some(deadline) => time::timeout(deadline, poll)
                .await
                .map_err(|_| ProvisionError::PowerTransitionTimeout { target })?,
            None => poll.await,
        }
    }

    /// Wait for the installer's completion report.
    async fn await_install(
        &self,
        install_rx: oneshot::Receiver<bool>,
    ) -> Result<(), ProvisionError> {
        let wait = async {
            match install_rx.await {
                Ok(true) => Ok(()),
                // An explicit failure report and a dropped slot both mean
                // the install did not finish
                Ok(false) | Err(_) => Err(ProvisionError::InstallFailed),
            }
        };

        match self.timings.install_deadline {
            Some(deadline) => time::timeout(deadline, wait)
                .await
                .map_err(|_| ProvisionError::InstallTimeout)?,
            None => wait.await,
        }
    }

    /// Run post-install commands, folding failures into a warning.
    async fn run_post_install(&self) -> Option<String> {
        let mut failures = Vec::new();
        for command in &self.host.os.post_install {
            if let Err(err) = self.post_install.run(&self.host.hostname, command).await {
                warn!(hostname = %self.host.hostname, command, error = %err, "post-install command failed");
                failures.push(format!("{command}: {err}"));
            }
        }
        if failures.is_empty() {
            None
        } else {
            Some(format!("post-install partial failure: {}", failures.join("; ")))
        }
    }

    /// Release the boot lease and BMC session. Safe to call on any exit.
    async fn cleanup(&self) {
        self.leases.remove(&self.host.mac).await;
        if let Err(err) = self.bmc.disconnect().await {
            warn!(hostname = %self.host.hostname, error = %err, "failed to release BMC session");
        }
    }

    fn set_phase(&self, phase: JobPhase) {
        info!(hostname = %self.host.hostname, %phase, "job phase");
        self.status.send_modify(|status| {
            status.phase = phase;
            status.updated_at = Utc::now();
        });
    }

    fn lease_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.timings.job_timeout)
            .unwrap_or_else(|_| chrono::Duration::minutes(30))
    }
}
