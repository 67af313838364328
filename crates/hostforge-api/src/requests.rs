//! Client request types
//!
//! One JSON object per logical message; the `task` field selects the
//! operation. Field names follow the wire protocol spoken by the web client.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Incoming client message, discriminated by `task`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "task")]
pub enum ClientRequest {
    /// Probe the target host for administrative access
    #[serde(rename = "check_password")]
    CheckPassword {
        /// Connection parameters for the target host
        host_data: HostData,
    },
    /// Run the full provisioning batch against a verified host
    #[serde(rename = "deploy_server")]
    DeployServer(DeployRequest),
}

/// Raw per-host connection parameters as submitted by the client
///
/// Everything arrives as strings; [`crate::validate`] turns this into a
/// typed [`HostDescriptor`] before the engine sees it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostData {
    /// Target host IPv4 address
    #[serde(default)]
    pub client_ip: String,
    /// SSH port
    #[serde(default)]
    pub client_port: String,
    /// SSH login
    #[serde(default)]
    pub client_login: String,
    /// SSH password
    #[serde(default)]
    pub client_password: String,
    /// Password for privilege elevation
    #[serde(default)]
    pub client_sudo_password: String,
    /// Hostname to assign to the target
    #[serde(default)]
    pub hostname: String,
    /// Site identity label, used in log lines and artifact names
    #[serde(default)]
    pub site_id: String,
    /// Name of the interface carrying the uplink
    #[serde(default)]
    pub uplink_interface: String,
}

/// Full deployment request
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    /// Connection parameters for the target host
    pub host_data: HostData,
    /// DHCP server configuration block
    #[serde(default)]
    pub dhcp: DhcpConfig,
    /// Whitespace-separated package names to install
    #[serde(default)]
    pub install_list: String,
    /// Names of application recipes to check out and install
    #[serde(default)]
    pub apps: Vec<String>,
    /// Client-side claim that credentials were verified.
    /// Accepted on the wire but never trusted; the session gate is
    /// enforced server-side.
    #[serde(default)]
    pub password_status: bool,
}

impl DeployRequest {
    /// Package names from the raw install list, in request order
    #[must_use]
    pub fn packages(&self) -> Vec<String> {
        self.install_list
            .split_whitespace()
            .map(ToString::to_string)
            .collect()
    }
}

/// DHCP server parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DhcpConfig {
    /// Whether the client requested DHCP configuration at all
    #[serde(default)]
    pub dhcp_status: bool,
    #[serde(default)]
    pub dhcp_network: String,
    #[serde(default)]
    pub dhcp_mask: String,
    #[serde(default)]
    pub dhcp_range_start: String,
    #[serde(default)]
    pub dhcp_range_end: String,
    #[serde(default)]
    pub dhcp_dns: String,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub dhcp_gateway: String,
    #[serde(default)]
    pub dhcp_broadcast: String,
    #[serde(default)]
    pub dhcp_interface: String,
}

/// Typed, validated per-host connection context
///
/// Immutable for the lifetime of a request. Produced only by the validators;
/// the engine never constructs one from raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDescriptor {
    /// Target address, syntactically valid IPv4
    pub addr: Ipv4Addr,
    /// SSH port
    pub port: u16,
    /// SSH login
    pub login: String,
    /// SSH password
    pub password: String,
    /// Privilege elevation password
    pub sudo_password: String,
    /// Hostname to assign (may be empty for the credential-check flow)
    pub hostname: String,
    /// Site identity label
    pub site_id: String,
    /// Uplink interface name (may be empty for the credential-check flow)
    pub uplink_interface: String,
}
