//! Job identifiers and status snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque provisioning job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Allocate a fresh job id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Phase of a provisioning job.
///
/// Phases advance strictly forward; `Failed` is reachable from every
/// non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    /// Forcing the host off before touching its boot order
    PoweringOff,
    /// Installing the boot lease and arming the one-shot network boot
    ArmingBoot,
    /// Powering the host back on
    PoweringOn,
    /// Waiting for the installer to report completion
    AwaitingInstall,
    /// Running post-install commands
    PostInstall,
    /// Terminal: provisioning finished
    Succeeded,
    /// Terminal: provisioning failed or was canceled
    Failed,
}

impl JobPhase {
    /// Whether the phase is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PoweringOff => "PoweringOff",
            Self::ArmingBoot => "ArmingBoot",
            Self::PoweringOn => "PoweringOn",
            Self::AwaitingInstall => "AwaitingInstall",
            Self::PostInstall => "PostInstall",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time snapshot of a job, published through a watch channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    /// Job identifier
    pub id: JobId,
    /// Host being provisioned
    pub hostname: String,
    /// Current phase
    pub phase: JobPhase,
    /// Phase that was active when the job failed
    pub failed_phase: Option<JobPhase>,
    /// Terminal error, for failed jobs
    pub error: Option<String>,
    /// Non-fatal warning (post-install partial failure)
    pub warning: Option<String>,
    /// When the job started
    pub started_at: DateTime<Utc>,
    /// When the snapshot was last updated
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    /// Initial snapshot for a freshly started job.
    #[must_use]
    pub fn new(id: JobId, hostname: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            hostname,
            phase: JobPhase::PoweringOff,
            failed_phase: None,
            error: None,
            warning: None,
            started_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(JobPhase::Succeeded.is_terminal());
        assert!(JobPhase::Failed.is_terminal());
        assert!(!JobPhase::PoweringOff.is_terminal());
        assert!(!JobPhase::AwaitingInstall.is_terminal());
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }
}
