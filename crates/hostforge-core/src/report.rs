//! Progress reporting
//!
//! Every status event goes two ways: unicast to the session's channel and
//! appended to the process-wide deploy log. A send failure on the channel
//! (client gone) never fails the task that produced the event.

use std::path::PathBuf;

use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::warn;

use hostforge_api::{FieldError, WsEvent};

use crate::error::CoreError;
use crate::task::TaskOutcome;

/// Append-only deploy log, one line per event:
/// `timestamp - host_identity text`
#[derive(Debug, Clone)]
pub struct DeployLog {
    path: PathBuf,
}

impl DeployLog {
    /// Open the log at `path`, seeding a new file with a start marker
    ///
    /// # Errors
    /// Returns `CoreError::IoError` when the file cannot be created.
    pub async fn ensure(path: PathBuf) -> Result<Self, CoreError> {
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CoreError::IoError(e.to_string()))?
        {
            return Ok(Self { path });
        }
        tokio::fs::write(&path, "Start log\n")
            .await
            .map_err(|e| CoreError::IoError(e.to_string()))?;
        Ok(Self { path })
    }

    /// Append one line. Log failures are warned about, never propagated:
    /// a full disk must not fail a deployment task.
    pub async fn append(&self, host_identity: &str, text: &str) {
        let line = format!("{} - {host_identity} {text}\n", Local::now());
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await
        }
        .await;

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "deploy log append failed");
        }
    }
}

/// Per-session progress reporter
#[derive(Debug, Clone)]
pub struct Reporter {
    events: mpsc::Sender<WsEvent>,
    log: DeployLog,
    /// Host identity prefix for log lines
    site: String,
}

impl Reporter {
    /// Reporter delivering to one session's channel and the shared log
    #[must_use]
    pub fn new(events: mpsc::Sender<WsEvent>, log: DeployLog, site: impl Into<String>) -> Self {
        Self {
            events,
            log,
            site: site.into(),
        }
    }

    async fn send(&self, event: WsEvent) {
        // No subscribers / closed session is fine
        let _ = self.events.send(event).await;
    }

    /// Task dispatched, about to execute
    pub async fn processing(&self, task: &str) {
        self.log.append(&self.site, &format!("{task} processing")).await;
        self.send(WsEvent::processing(task)).await;
    }

    /// Exactly-one terminal event per task execution
    pub async fn outcome(&self, outcome: &TaskOutcome) {
        self.log
            .append(&self.site, &format!("{} {}", outcome.task, outcome.label()))
            .await;
        self.send(WsEvent::task_outcome(&outcome.task, outcome.succeeded))
            .await;
    }

    /// Log-only annotation, no session event
    pub async fn note(&self, text: &str) {
        self.log.append(&self.site, text).await;
    }

    /// Connection or validation failure surfaced as an alert
    pub async fn alert(&self, errors: Vec<FieldError>) {
        let summary: Vec<String> = errors.iter().map(|e| e.msg.clone()).collect();
        self.log.append(&self.site, &summary.join("; ")).await;
        self.send(WsEvent::alert(errors)).await;
    }

    /// Single terminal event for the whole batch
    pub async fn finish(&self) {
        self.log.append(&self.site, "finish completed").await;
        self.send(WsEvent::finish()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostforge_api::StatusPayload;

    fn temp_log_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hostforge-test-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn new_log_is_seeded() {
        let path = temp_log_path("seed");
        tokio::fs::remove_file(&path).await.ok();

        let log = DeployLog::ensure(path.clone()).await.unwrap();
        log.append("site-1", "nginx completed").await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("Start log\n"));
        assert!(contents.contains("site-1 nginx completed"));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn existing_log_is_not_reseeded() {
        let path = temp_log_path("reseed");
        tokio::fs::write(&path, "Start log\nold line\n").await.unwrap();

        DeployLog::ensure(path.clone()).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("old line"));
        assert_eq!(contents.matches("Start log").count(), 1);

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn outcome_reaches_channel_and_log() {
        let path = temp_log_path("outcome");
        tokio::fs::remove_file(&path).await.ok();
        let log = DeployLog::ensure(path.clone()).await.unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let reporter = Reporter::new(tx, log, "site-9");

        reporter.processing("nginx").await;
        reporter
            .outcome(&TaskOutcome {
                task: "nginx".to_string(),
                succeeded: false,
                raw_output: String::new(),
            })
            .await;

        let processing = rx.recv().await.unwrap();
        assert!(matches!(processing.status, StatusPayload::Text(ref s) if s == "processing"));
        let terminal = rx.recv().await.unwrap();
        assert!(!terminal.result);
        assert!(matches!(terminal.status, StatusPayload::Text(ref s) if s == "broked"));

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("site-9 nginx processing"));
        assert!(contents.contains("site-9 nginx failed"));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn closed_session_does_not_fail_reporting() {
        let path = temp_log_path("closed");
        tokio::fs::remove_file(&path).await.ok();
        let log = DeployLog::ensure(path.clone()).await.unwrap();

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let reporter = Reporter::new(tx, log, "site-2");

        // Must not panic or error
        reporter.finish().await;

        tokio::fs::remove_file(&path).await.ok();
    }
}
