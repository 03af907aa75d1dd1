//! Provisioning orchestrator
//!
//! Drives bare-metal hosts through OS reinstalls: each job forces the
//! host off, arms a one-shot network boot backed by a boot lease, powers
//! the host on, waits for the installer's completion report, and runs
//! post-install commands. The [`JobCoordinator`] enforces one active job
//! per host and exposes start/cancel/status plus the install-completion
//! entry point.
//!
//! # Example
//!
//! ```no_run
//! use boot_server::LeaseTable;
//! use provisioner::{JobCoordinator, JobTimings};
//!
//! # async fn example(host: host_model::Host) -> Result<(), Box<dyn std::error::Error>> {
//! let leases = LeaseTable::new();
//! let coordinator = JobCoordinator::new(
//!     leases,
//!     "http://10.0.0.1:8080".to_string(),
//!     JobTimings::default(),
//! );
//!
//! let id = coordinator.start(host).await?;
//! // ... installer finishes and reports back ...
//! coordinator.report_install("host-01", true).await;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod error;
pub mod job;
pub mod machine;
pub mod signal;

pub use coordinator::{BmcFactory, DefaultBmcFactory, JobCoordinator};
pub use error::ProvisionError;
pub use job::{JobId, JobPhase, JobStatus};
pub use machine::{JobTimings, LoggingPostInstallRunner, PostInstallRunner};
pub use signal::InstallSignals;
