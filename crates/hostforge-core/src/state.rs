//! Session and credential-check state machines

use std::fmt;

/// Per-session deployment state
///
///// Destructive operations are gated on `InventoryReady`: nothing but a
/// credential check may run while a session is `AwaitingCredentials`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No verified credentials yet; only the credential check may run
    AwaitingCredentials,
    /// Credentials verified and inventory written; deployment may start
    InventoryReady,
    /// A deployment batch is in flight
    Deploying,
    /// All dispatched tasks of the last batch have been evaluated
    Finished,
}

impl SessionState {
    /// Whether the transition is allowed by the session lifecycle
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::{AwaitingCredentials, Deploying, Finished, InventoryReady};
        matches!(
            (self, next),
            (AwaitingCredentials, InventoryReady)
                | (InventoryReady, Deploying)
                | (Deploying, Finished)
                // A finished session may verify again or redeploy against
                // its existing inventory record
                | (Finished, InventoryReady)
                | (Finished, Deploying)
        )
    }

    /// Whether a deployment batch may be dispatched from this state
    #[must_use]
    pub fn can_deploy(self) -> bool {
        self.can_transition_to(SessionState::Deploying)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::AwaitingCredentials => "awaiting_credentials",
            SessionState::InventoryReady => "inventory_ready",
            SessionState::Deploying => "deploying",
            SessionState::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Outcome states of one credential-check attempt
///
/// `Idle -> Verifying -> {Denied, ConnectionError, Verified}`; the client may
/// resubmit after a terminal outcome, re-entering `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Idle,
    Verifying,
    Denied,
    ConnectionError,
    Verified,
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CredentialState::Idle => "idle",
            CredentialState::Verifying => "verifying",
            CredentialState::Denied => "denied",
            CredentialState::ConnectionError => "connection_error",
            CredentialState::Verified => "verified",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_is_gated_on_verification() {
        assert!(!SessionState::AwaitingCredentials.can_deploy());
        assert!(SessionState::InventoryReady.can_deploy());
        assert!(!SessionState::Deploying.can_deploy());
        assert!(SessionState::Finished.can_deploy());
    }

    #[test]
    fn no_skipping_verification() {
        assert!(!SessionState::AwaitingCredentials.can_transition_to(SessionState::Deploying));
        assert!(!SessionState::AwaitingCredentials.can_transition_to(SessionState::Finished));
        assert!(!SessionState::Deploying.can_transition_to(SessionState::InventoryReady));
    }
}
