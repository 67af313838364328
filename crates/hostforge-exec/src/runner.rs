//! Out-of-process automation runner using `tokio::process`

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::RunOutput;
use crate::traits::TaskRunner;

/// Runs `ansible-playbook <descriptor> -i <inventory>` as a worker process
///
/// Each invocation spawns an independent process, so concurrently dispatched
/// tasks run in true parallel.
#[derive(Debug, Clone)]
pub struct AnsibleRunner {
    binary: String,
}

impl AnsibleRunner {
    /// Runner using `ansible-playbook` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: "ansible-playbook".to_string(),
        }
    }

    /// Runner using a custom executable, for tests and packaging overrides
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn execute(&self, playbook: &Path, inventory: &Path) -> Result<RunOutput, ExecError> {
        let start = Instant::now();

        debug!(playbook = %playbook.display(), inventory = %inventory.display(), "invoking runner");

        let child = Command::new(&self.binary)
            .arg(playbook)
            .arg("-i")
            .arg(inventory)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();
        let status = output.status.code().unwrap_or(-1);

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        debug!(status, duration = ?duration, "runner finished");

        Ok(RunOutput {
            status,
            output: combined,
            duration,
        })
    }
}

impl Default for AnsibleRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRunner for AnsibleRunner {
    #[instrument(skip(self), level = "debug")]
    async fn run(&self, playbook: &Path, inventory: &Path) -> Result<RunOutput, ExecError> {
        self.execute(playbook, inventory).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn run_with_timeout(
        &self,
        playbook: &Path,
        inventory: &Path,
        timeout_duration: Duration,
    ) -> Result<RunOutput, ExecError> {
        let result = timeout(timeout_duration, self.execute(playbook, inventory)).await;

        match result {
            Ok(Ok(run_output)) => Ok(run_output),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                error!(
                    playbook = %playbook.display(),
                    timeout = ?timeout_duration,
                    "runner timed out"
                );
                Err(ExecError::Timeout {
                    timeout: timeout_duration,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn captures_output_without_erroring() {
        let runner = AnsibleRunner::with_binary("echo");
        let output = runner
            .run(&PathBuf::from("site.yml"), &PathBuf::from("hosts"))
            .await
            .unwrap();

        assert!(output.exited_cleanly());
        assert!(output.output.contains("site.yml"));
        assert!(output.output.contains("hosts"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_ordinary_outcome() {
        let runner = AnsibleRunner::with_binary("false");
        let output = runner
            .run(&PathBuf::from("site.yml"), &PathBuf::from("hosts"))
            .await
            .unwrap();

        assert!(!output.exited_cleanly());
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let runner = AnsibleRunner::with_binary("/definitely/not/present");
        let result = runner
            .run(&PathBuf::from("site.yml"), &PathBuf::from("hosts"))
            .await;

        assert!(matches!(result, Err(ExecError::SpawnError(_))));
    }
}
