//! hostforge-core: Deployment engine and orchestration logic
//!
//! Implements the `DeployerActor` on the kameo framework, the process-wide
//! inventory store, credential verification, task descriptor rendering, and
//! the deployment job that drives task execution and progress reporting.

pub mod actor;
pub mod config;
pub mod error;
pub mod inventory;
pub mod job;
pub mod message;
pub mod render;
pub mod report;
pub mod state;
pub mod task;
pub mod verify;

pub use actor::deployer::{DeployerActor, DeployerActorArgs};
pub use config::{GitSettings, Settings};
pub use error::CoreError;
pub use inventory::{render_inventory, InventoryRecord, InventoryStore};
pub use job::DeploymentJob;
pub use message::{StartDeployment, VerifyCredentials};
pub use report::{DeployLog, Reporter};
pub use state::{CredentialState, SessionState};
pub use task::{sentinel_matches, AuxFile, TaskOutcome, TaskSpec};
pub use verify::{parse_interfaces, CredentialOutcome, CredentialVerifier, ADMIN_MARKER};
