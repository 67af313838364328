//! Trait seams for the runner and the credential probe

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::{ProbeReport, ProbeTarget, RunOutput};

/// Applies a rendered task descriptor to a target host
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Execute the descriptor against the host addressed by `inventory`
    ///
    /// # Errors
    /// Only infrastructure faults (spawn/I-O) are errors; a failing task is
    /// reported through [`RunOutput`].
    async fn run(&self, playbook: &Path, inventory: &Path) -> Result<RunOutput, ExecError>;

    /// Like [`TaskRunner::run`] with a deadline
    ///
    /// # Errors
    /// Returns `ExecError::Timeout` when the deadline expires.
    async fn run_with_timeout(
        &self,
        playbook: &Path,
        inventory: &Path,
        timeout: Duration,
    ) -> Result<RunOutput, ExecError>;
}

/// Probes a host for administrative capability
#[async_trait]
pub trait SudoProbe: Send + Sync {
    /// Connect, request the elevated capability listing, and enumerate
    /// network interfaces
    ///
    /// # Errors
    /// Any connection-level fault (unreachable, auth failure, timeout).
    async fn probe(&self, target: &ProbeTarget) -> Result<ProbeReport, ExecError>;
}
