//! One deployment batch against one host
//!
//! A job renders every requested task descriptor up front, dispatches
//! executions into a [`JoinSet`], and emits exactly one `finish` event after
//! the set drains. Task executions are isolated: a failing, timing-out, or
//! panicking task never stops its siblings.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use hostforge_api::{DeployRequest, HostDescriptor};
use hostforge_exec::TaskRunner;

use crate::config::Settings;
use crate::error::CoreError;
use crate::inventory::InventoryStore;
use crate::render::{self, RenderContext};
use crate::report::Reporter;
use crate::task::{sentinel_matches, TaskOutcome, TaskSpec};

/// Runs one deployment batch to completion
pub struct DeploymentJob {
    settings: Arc<Settings>,
    store: Arc<InventoryStore>,
    runner: Arc<dyn TaskRunner>,
    reporter: Reporter,
    host: HostDescriptor,
    request: DeployRequest,
    stage_seq: AtomicU64,
}

async fn stage_file(path: &std::path::Path, contents: &str) -> Result<(), CoreError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| CoreError::IoError(e.to_string()))
}

/// Staged descriptor plus its auxiliary files, removed after execution
struct StagedTask {
    playbook: PathBuf,
    files: Vec<PathBuf>,
}

impl StagedTask {
    async fn cleanup(self) {
        for file in self.files {
            if let Err(e) = tokio::fs::remove_file(&file).await {
                warn!(path = %file.display(), error = %e, "stale artifact not removed");
            }
        }
    }
}

impl DeploymentJob {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<InventoryStore>,
        runner: Arc<dyn TaskRunner>,
        reporter: Reporter,
        host: HostDescriptor,
        request: DeployRequest,
    ) -> Self {
        Self {
            settings,
            store,
            runner,
            reporter,
            host,
            request,
            stage_seq: AtomicU64::new(0),
        }
    }

    /// Dispatch the batch and emit `finish` once every execution resolved
    pub async fn run(self) {
        let job = Arc::new(self);

        // The session normally wrote the record at credential verification;
        // write it here if this session skipped that step.
        if !job.store.contains(job.host.addr).await {
            if let Err(e) = job.store.put(&job.host).await {
                error!(host = %job.host.addr, error = %e, "inventory write failed");
                job.reporter
                    .note(&format!("inventory write failed: {e}"))
                    .await;
                job.reporter.finish().await;
                return;
            }
        }

        let ctx = RenderContext {
            host: &job.host,
            staging_dir: &job.settings.staging_dir,
        };

        let installs: Vec<TaskSpec> = job
            .request
            .packages()
            .iter()
            .map(|package| render::package_install(ctx, package))
            .collect();

        let dhcp_unit: Vec<TaskSpec> = if job.request.dhcp.dhcp_status {
            vec![
                render::package_install(ctx, "isc-dhcp-server"),
                render::dhcp_server(ctx, &job.request.dhcp),
            ]
        } else {
            Vec::new()
        };

        let mut config_specs = vec![
            render::reverse_proxy(ctx),
            render::scheduled_sync(ctx),
            render::kernel_params(ctx),
            render::boot_service(ctx, &job.request.dhcp),
            render::backup_agent(ctx, &job.settings),
        ];
        if let Some(spec) = render::hostname_change(ctx) {
            config_specs.push(spec);
        }
        for app in &job.request.apps {
            match render::app_checkout(ctx, app, &job.settings.git) {
                Some(spec) => config_specs.push(spec),
                None => {
                    warn!(app = %app, "unknown application requested, skipped");
                    job.reporter.note(&format!("unknown application {app}")).await;
                }
            }
        }

        info!(
            host = %job.host.addr,
            installs = installs.len(),
            tasks = dhcp_unit.len() + config_specs.len(),
            "deployment dispatched"
        );

        let mut set = JoinSet::new();

        for spec in installs {
            let job = job.clone();
            set.spawn(async move { job.execute_task(spec).await });
        }

        if job.settings.wait_for_installs {
            Self::drain(&mut set).await;
        }

        // The daemon package install must precede its configuration, so both
        // run sequentially inside one unit.
        if !dhcp_unit.is_empty() {
            let job = job.clone();
            set.spawn(async move {
                for spec in dhcp_unit {
                    job.execute_task(spec).await;
                }
            });
        }

        for spec in config_specs {
            let job = job.clone();
            set.spawn(async move { job.execute_task(spec).await });
        }

        Self::drain(&mut set).await;

        job.reporter.finish().await;
    }

    async fn drain(set: &mut JoinSet<()>) {
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "task execution panicked");
            }
        }
    }

    /// One task execution: processing event, run, terminal event
    async fn execute_task(&self, spec: TaskSpec) {
        self.reporter.processing(&spec.name).await;
        let outcome = self.run_task(&spec).await;
        self.reporter.outcome(&outcome).await;
    }

    async fn run_task(&self, spec: &TaskSpec) -> TaskOutcome {
        let record = match self.store.get(self.host.addr).await {
            Ok(record) => record,
            Err(e) => {
                warn!(host = %self.host.addr, task = %spec.name, "inventory record missing");
                self.reporter
                    .note(&format!("{} inventory missing", spec.name))
                    .await;
                return TaskOutcome {
                    task: spec.name.clone(),
                    succeeded: false,
                    raw_output: e.to_string(),
                };
            }
        };

        let staged = match self.stage(spec).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(task = %spec.name, error = %e, "staging failed");
                return TaskOutcome {
                    task: spec.name.clone(),
                    succeeded: false,
                    raw_output: e.to_string(),
                };
            }
        };

        let result = self
            .runner
            .run_with_timeout(&staged.playbook, &record.path, self.settings.task_timeout())
            .await;

        staged.cleanup().await;

        match result {
            Ok(run) => TaskOutcome {
                task: spec.name.clone(),
                succeeded: sentinel_matches(&spec.sentinel, &run.output),
                raw_output: run.output,
            },
            Err(e) => {
                warn!(task = %spec.name, error = %e, "task execution failed");
                TaskOutcome {
                    task: spec.name.clone(),
                    succeeded: false,
                    raw_output: e.to_string(),
                }
            }
        }
    }

    /// Write the descriptor and its auxiliary files into the staging
    /// directory. Partial writes are removed before returning an error.
    ///
    /// A batch may dispatch the same task name twice (repeated packages,
    /// or `isc-dhcp-server` appearing in the install list while the DHCP
    /// unit installs it too), so each staged descriptor gets a
    /// per-execution sequence number to keep its path private.
    async fn stage(&self, spec: &TaskSpec) -> Result<StagedTask, CoreError> {
        let seq = self.stage_seq.fetch_add(1, Ordering::Relaxed);
        let playbook = self.settings.staging_dir.join(format!(
            "{}_{}_{}_{}.yml",
            self.host.addr, self.host.site_id, spec.name, seq
        ));
        let mut written = Vec::with_capacity(spec.aux_files.len() + 1);

        stage_file(&playbook, &spec.playbook).await?;
        written.push(playbook.clone());

        for aux in &spec.aux_files {
            if let Err(e) = stage_file(&aux.path, &aux.contents).await {
                StagedTask {
                    playbook: playbook.clone(),
                    files: written,
                }
                .cleanup()
                .await;
                return Err(e);
            }
            written.push(aux.path.clone());
        }

        Ok(StagedTask {
            playbook,
            files: written,
        })
    }
}
