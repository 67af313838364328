//! Actor layer

pub mod deployer;

pub use deployer::{DeployerActor, DeployerActorArgs};
