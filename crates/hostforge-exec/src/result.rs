//! Result and parameter types for execution backends

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Output of one runner invocation
///
/// A non-zero exit status is an ordinary outcome here, never an error; the
/// engine decides success by inspecting the output text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Process exit status (-1 when unavailable)
    pub status: i32,
    /// Combined stdout and stderr, verbatim
    pub output: String,
    /// Wall-clock execution time
    pub duration: Duration,
}

impl RunOutput {
    /// Exit status was zero
    #[must_use]
    pub fn exited_cleanly(&self) -> bool {
        self.status == 0
    }
}

/// Connection parameters for the credential probe
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    /// Host address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
    /// Password fed to the elevated-capability listing
    pub sudo_password: String,
}

/// Raw capability listing plus interface enumeration from one probe
///
/// Classification (granted vs. denied) happens upstream; the probe only
/// transports text.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Output of the elevated-privilege capability listing
    pub sudo_listing: String,
    /// Raw listing of `/sys/class/net/`
    pub interfaces_raw: String,
}
