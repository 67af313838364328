//! hostforge daemon
//!
//! WebSocket provisioning service: verifies credentials on target hosts,
//! then drives deployment batches through the kameo-based engine while
//! streaming per-task progress back to the client.

use std::sync::Arc;

use color_eyre::Result;
use kameo::actor::Spawn;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hostforge_core::{DeployLog, DeployerActor, DeployerActorArgs, InventoryStore};
use hostforge_exec::{AnsibleRunner, SshProbe};

mod api;
mod config;
mod router;
mod state;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::load_default()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level)),
        )
        .init();

    let log = DeployLog::ensure(config.engine.deploy_log.clone()).await?;
    let store = Arc::new(InventoryStore::new(config.engine.staging_dir.clone()));

    let deployer = DeployerActor::spawn(DeployerActorArgs {
        settings: config.engine.clone(),
        store,
        runner: Arc::new(AnsibleRunner::new()),
        probe: Arc::new(SshProbe::new()),
        log: log.clone(),
    });

    let app = router::create_router(Arc::new(AppState::new(deployer, config.clone(), log)));

    let listener = tokio::net::TcpListener::bind(&config.daemon.bind).await?;
    info!(bind = %config.daemon.bind, "hostforged listening");
    axum::serve(listener, app).await?;

    Ok(())
}
