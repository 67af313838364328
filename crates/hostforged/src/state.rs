//! Application state shared across HTTP handlers

use std::sync::Arc;

use kameo::actor::ActorRef;

use hostforge_core::{DeployLog, DeployerActor};

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Reference to the deployer actor
    pub deployer: ActorRef<DeployerActor>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared deploy log, for session lifecycle lines
    pub log: DeployLog,
}

impl AppState {
    /// Create new application state
    pub fn new(deployer: ActorRef<DeployerActor>, config: Config, log: DeployLog) -> Self {
        Self {
            deployer,
            config: Arc::new(config),
            log,
        }
    }
}
