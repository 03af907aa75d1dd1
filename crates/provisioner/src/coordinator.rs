//! Job coordinator
//!
//! Owns the set of provisioning jobs: at most one active job per
//! hostname, cooperative cancellation, retained status for terminal jobs,
//! and the install-completion entry point. Each job runs as its own Tokio
//! task around a [`StateMachine`].

use crate::error::ProvisionError;
use crate::job::{JobId, JobStatus};
use crate::machine::{JobTimings, LoggingPostInstallRunner, PostInstallRunner, StateMachine};
use crate::signal::InstallSignals;
use bmc_client::{BmcClient, IpmiClient, RedfishClient};
use boot_server::LeaseTable;
use host_model::{BmcEndpoint, BmcProtocol, Host};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex};
use tracing::{debug, info};

/// Builds a BMC client for a host at job start.
///
/// The default factory selects the backend from the endpoint's protocol;
/// tests inject mocks through this seam.
pub trait BmcFactory: Send + Sync {
    /// Construct a client for the endpoint.
    fn build(&self, endpoint: &BmcEndpoint) -> Result<Arc<dyn BmcClient>, ProvisionError>;
}

/// Protocol-selecting factory over the real Redfish and IPMI backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBmcFactory;

impl BmcFactory for DefaultBmcFactory {
    fn build(&self, endpoint: &BmcEndpoint) -> Result<Arc<dyn BmcClient>, ProvisionError> {
        match endpoint.protocol {
            BmcProtocol::Redfish => Ok(Arc::new(RedfishClient::from_endpoint(endpoint)?)),
            BmcProtocol::Ipmi => Ok(Arc::new(IpmiClient::from_endpoint(endpoint))),
        }
    }
}

struct JobHandle {
    hostname: String,
    // Present until the job is canceled; dropping it does not cancel
    // a finished job
    cancel: Option<oneshot::Sender<()>>,
    status: watch::Receiver<JobStatus>,
}

#[derive(Default)]
struct Jobs {
    // Single-active-job invariant lives here: a hostname is present
    // exactly while its job is non-terminal
    active_by_host: HashMap<String, JobId>,
    // Terminal jobs stay here for status queries until cleared
    by_id: HashMap<JobId, JobHandle>,
}

struct Inner {
    leases: LeaseTable,
    config_base_url: String,
    timings: JobTimings,
    factory: Arc<dyn BmcFactory>,
    post_install: Arc<dyn PostInstallRunner>,
    signals: InstallSignals,
    jobs: Mutex<Jobs>,
}

/// Coordinates provisioning jobs across hosts.
///
/// Cheap to clone; all clones share the same job table.
#[derive(Clone)]
pub struct JobCoordinator {
    inner: Arc<Inner>,
}

impl JobCoordinator {
    /// Create a coordinator with the default BMC factory and post-install
    /// runner.
    #[must_use]
    pub fn new(leases: LeaseTable, config_base_url: String, timings: JobTimings) -> Self {
        Self::with_backends(
            leases,
            config_base_url,
            timings,
            Arc::new(DefaultBmcFactory),
            Arc::new(LoggingPostInstallRunner),
        )
    }

    /// Create a coordinator with injected backends.
    #[must_use]
    pub fn with_backends(
        leases: LeaseTable,
        config_base_url: String,
        timings: JobTimings,
        factory: Arc<dyn BmcFactory>,
        post_install: Arc<dyn PostInstallRunner>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                leases,
                config_base_url,
                timings,
                factory,
                post_install,
                signals: InstallSignals::new(),
                jobs: Mutex::new(Jobs::default()),
            }),
        }
    }

    /// Start a provisioning job for a host.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` when an active job exists for the hostname;
    /// validation and client-construction failures surface here before
    /// any task is spawned.
    pub async fn start(&self, host: Host) -> Result<JobId, ProvisionError> {
        let host = host.validated()?;
        let bmc = self.inner.factory.build(&host.bmc)?;

        let mut jobs = self.inner.jobs.lock().await;
        if jobs.active_by_host.contains_key(&host.hostname) {
            return Err(ProvisionError::AlreadyRunning(host.hostname));
        }

        let id = JobId::new();
        let hostname = host.hostname.clone();
        let (status_tx, status_rx) = watch::channel(JobStatus::new(id, hostname.clone()));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let install_rx = self.inner.signals.register(&hostname).await;

        let machine = StateMachine {
            host,
            bmc,
            leases: self.inner.leases.clone(),
            config_base_url: self.inner.config_base_url.clone(),
            timings: self.inner.timings.clone(),
            status: status_tx,
            post_install: Arc::clone(&self.inner.post_install),
        };

        let inner = Arc::clone(&self.inner);
        let task_hostname = hostname.clone();
        tokio::spawn(async move {
            machine.run(install_rx, cancel_rx).await;
            inner.signals.deregister(&task_hostname).await;
            inner.jobs.lock().await.active_by_host.remove(&task_hostname);
        });

        info!(%id, hostname, "started provisioning job");
        jobs.active_by_host.insert(hostname.clone(), id);
        jobs.by_id.insert(
            id,
            JobHandle {
                hostname,
                cancel: Some(cancel_tx),
                status: status_rx,
            },
        );
        Ok(id)
    }

    /// Request cooperative cancellation of a job.
    ///
    /// Idempotent; canceling a job that already reached a terminal phase
    /// is a no-op.
    pub async fn cancel(&self, id: JobId) -> Result<(), ProvisionError> {
        let mut jobs = self.inner.jobs.lock().await;
        let handle = jobs.by_id.get_mut(&id).ok_or(ProvisionError::NoSuchJob)?;
        if let Some(tx) = handle.cancel.take() {
            // Send fails only when the job already finished
            if tx.send(()).is_ok() {
                info!(%id, hostname = %handle.hostname, "canceling provisioning job");
            }
        }
        Ok(())
    }

    /// Current status snapshot for a job.
    pub async fn status(&self, id: JobId) -> Option<JobStatus> {
        let jobs = self.inner.jobs.lock().await;
        jobs.by_id.get(&id).map(|h| h.status.borrow().clone())
    }

    /// Watch channel tracking a job's status updates.
    pub async fn watch(&self, id: JobId) -> Option<watch::Receiver<JobStatus>> {
        let jobs = self.inner.jobs.lock().await;
        jobs.by_id.get(&id).map(|h| h.status.clone())
    }

    /// Drop a terminal job's retained status.
    ///
    /// # Errors
    ///
    /// `NoSuchJob` for unknown ids; `AlreadyRunning` when the job has not
    /// reached a terminal phase yet.
    pub async fn clear(&self, id: JobId) -> Result<(), ProvisionError> {
        let mut jobs = self.inner.jobs.lock().await;
        let handle = jobs.by_id.get(&id).ok_or(ProvisionError::NoSuchJob)?;
        if !handle.status.borrow().phase.is_terminal() {
            return Err(ProvisionError::AlreadyRunning(handle.hostname.clone()));
        }
        jobs.by_id.remove(&id);
        debug!(%id, "cleared terminal job");
        Ok(())
    }

    /// Report install completion for a hostname.
    ///
    /// Returns `true` when a job was waiting for the report.
    pub async fn report_install(&self, hostname: &str, success: bool) -> bool {
        self.inner.signals.report(hostname, success).await
    }
}
