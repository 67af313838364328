//! `DeployerActor`: process-wide deployment entry point
//!
//! Owns the inventory store and the engine settings. Credential checks are
//! handled inline; deployment batches are spawned onto the runtime so one
//! long batch never serializes the actor's mailbox behind it.

use std::sync::Arc;

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tracing::{info, warn};

use hostforge_exec::{SudoProbe, TaskRunner};

use crate::config::Settings;
use crate::error::CoreError;
use crate::inventory::InventoryStore;
use crate::job::DeploymentJob;
use crate::message::{StartDeployment, VerifyCredentials};
use crate::report::{DeployLog, Reporter};
use crate::verify::{CredentialOutcome, CredentialVerifier};

/// Arguments for spawning a `DeployerActor`
pub struct DeployerActorArgs {
    /// Engine settings
    pub settings: Settings,
    /// Process-wide inventory store
    pub store: Arc<InventoryStore>,
    /// Task runner shared by all deployments
    pub runner: Arc<dyn TaskRunner>,
    /// Credential probe shared by all verifications
    pub probe: Arc<dyn SudoProbe>,
    /// Append-only deploy log
    pub log: DeployLog,
}

/// Deployment orchestrator
pub struct DeployerActor {
    settings: Arc<Settings>,
    store: Arc<InventoryStore>,
    runner: Arc<dyn TaskRunner>,
    verifier: CredentialVerifier,
    log: DeployLog,
}

impl Actor for DeployerActor {
    type Args = DeployerActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(id = %actor_ref.id(), "DeployerActor starting");

        Ok(Self {
            settings: Arc::new(args.settings),
            store: args.store,
            runner: args.runner,
            verifier: CredentialVerifier::new(args.probe),
            log: args.log,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(reason = ?reason, "DeployerActor stopping");
        Ok(())
    }
}

/// Host identity used in deploy log lines
fn log_identity(host: &hostforge_api::HostDescriptor) -> String {
    if host.site_id.is_empty() {
        host.addr.to_string()
    } else {
        format!("site:{}", host.site_id)
    }
}

impl Message<VerifyCredentials> for DeployerActor {
    type Reply = Result<CredentialOutcome, CoreError>;

    async fn handle(
        &mut self,
        msg: VerifyCredentials,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let identity = log_identity(&msg.host);
        let outcome = self.verifier.verify(&msg.host).await;

        match &outcome {
            CredentialOutcome::Granted { .. } => {
                // The record is what a later deploy_server executes against
                self.store.put(&msg.host).await?;
                self.log.append(&identity, "check_password granted").await;
            }
            CredentialOutcome::Denied => {
                self.log.append(&identity, "check_password denied").await;
            }
            CredentialOutcome::ConnectionError { error } => {
                self.log.append(&identity, error).await;
            }
        }

        Ok(outcome)
    }
}

impl Message<StartDeployment> for DeployerActor {
    type Reply = Result<(), CoreError>;

    async fn handle(
        &mut self,
        msg: StartDeployment,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        if msg.events.is_closed() {
            warn!(host = %msg.host.addr, "session gone before dispatch");
        }

        let reporter = Reporter::new(msg.events, self.log.clone(), log_identity(&msg.host));
        let job = DeploymentJob::new(
            self.settings.clone(),
            self.store.clone(),
            self.runner.clone(),
            reporter,
            msg.host,
            msg.request,
        );

        // Reply acknowledges dispatch; progress flows over the session channel
        tokio::spawn(job.run());

        Ok(())
    }
}
