//! Credential verification
//!
//! Probes the target for administrative capability and enumerates its
//! network interfaces. Gates every destructive operation: nothing deploys
//! until a probe resolves `Granted`.

use std::sync::Arc;

use tracing::{info, warn};

use hostforge_api::HostDescriptor;
use hostforge_exec::{ProbeTarget, SudoProbe};

/// Marker in the capability listing that identifies unrestricted access
pub const ADMIN_MARKER: &str = "(ALL : ALL) ALL";

/// Resolution of one credential-check attempt
#[derive(Debug, Clone, kameo_macros::Reply)]
pub enum CredentialOutcome {
    /// Unrestricted administrative access confirmed
    Granted {
        /// Interface names found on the host
        interfaces: Vec<String>,
    },
    /// Host reachable but capability listing is restricted
    Denied,
    /// Probe could not complete; raw error text preserved for the log
    ConnectionError {
        /// Fault description
        error: String,
    },
}

/// Normalize the raw interface listing into a token list
///
/// The listing arrives from a pty, so tabs and carriage returns show up
/// alongside newlines.
#[must_use]
pub fn parse_interfaces(raw: &str) -> Vec<String> {
    raw.split(['\t', '\r', '\n', ' '])
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Classifies probe reports into credential outcomes
pub struct CredentialVerifier {
    probe: Arc<dyn SudoProbe>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(probe: Arc<dyn SudoProbe>) -> Self {
        Self { probe }
    }

    /// Probe the host and classify the result.
    ///
    /// Connection-level faults are an outcome, never an error: the session
    /// stays alive and the client may resubmit.
    pub async fn verify(&self, host: &HostDescriptor) -> CredentialOutcome {
        let target = ProbeTarget {
            host: host.addr.to_string(),
            port: host.port,
            user: host.login.clone(),
            password: host.password.clone(),
            sudo_password: host.sudo_password.clone(),
        };

        match self.probe.probe(&target).await {
            Ok(report) if report.sudo_listing.contains(ADMIN_MARKER) => {
                let interfaces = parse_interfaces(&report.interfaces_raw);
                info!(host = %host.addr, interfaces = interfaces.len(), "credentials verified");
                CredentialOutcome::Granted { interfaces }
            }
            Ok(_) => {
                info!(host = %host.addr, "credentials denied");
                CredentialOutcome::Denied
            }
            Err(e) => {
                warn!(host = %host.addr, error = %e, "credential probe failed");
                CredentialOutcome::ConnectionError {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_listing_is_normalized() {
        let raw = "eth0\tlo\r\nwlan0  \r\n";
        assert_eq!(parse_interfaces(raw), vec!["eth0", "lo", "wlan0"]);
    }

    #[test]
    fn empty_listing_yields_no_interfaces() {
        assert!(parse_interfaces(" \r\n\t").is_empty());
    }

    #[test]
    fn admin_marker_is_the_literal_sudoers_line() {
        let listing = "User deploy may run the following commands:\n    (ALL : ALL) ALL\n";
        assert!(listing.contains(ADMIN_MARKER));
        let restricted = "User deploy may run:\n    (root) /usr/bin/systemctl restart nginx\n";
        assert!(!restricted.contains(ADMIN_MARKER));
    }
}
