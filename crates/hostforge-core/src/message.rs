//! Message types for the deployer actor
//!
//! Handlers are implemented in [`crate::actor::deployer`].

use tokio::sync::mpsc;

use hostforge_api::{DeployRequest, HostDescriptor, WsEvent};

/// Probe a host for administrative access; the synchronous gate in front
/// of every deployment
#[derive(Debug)]
pub struct VerifyCredentials {
    /// Validated target host
    pub host: HostDescriptor,
}

/// Dispatch a deployment batch for a verified host
///
/// The reply acknowledges dispatch only; progress and the terminal `finish`
/// event arrive on `events`.
pub struct StartDeployment {
    /// Validated target host
    pub host: HostDescriptor,
    /// What to install and configure
    pub request: DeployRequest,
    /// Session channel for progress events
    pub events: mpsc::Sender<WsEvent>,
}

impl std::fmt::Debug for StartDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartDeployment")
            .field("host", &self.host.addr)
            .field("packages", &self.request.packages())
            .finish_non_exhaustive()
    }
}
