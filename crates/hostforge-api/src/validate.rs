//! Field-level request validation
//!
//! Shape and type checks on submitted parameters. The engine refuses to act
//! on anything that has not passed through here; failures are forwarded to
//! the client verbatim as an `Alert` event.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::requests::{DhcpConfig, HostData, HostDescriptor};

/// One validation failure, pydantic-shaped for the existing web client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field location
    pub loc: String,
    /// Human-readable message
    pub msg: String,
    /// Error category
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    /// A value-level failure on a named field
    pub fn new(loc: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            msg: msg.into(),
            kind: "value_error".to_string(),
        }
    }

    /// A connection-level failure (no field to blame)
    pub fn connection(msg: impl Into<String>) -> Self {
        Self {
            loc: "no connect".to_string(),
            msg: msg.into(),
            kind: "connection_error".to_string(),
        }
    }
}

fn require(errors: &mut Vec<FieldError>, loc: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(FieldError::new(loc, format!("{loc} field cannot be empty")));
        false
    } else {
        true
    }
}

fn require_ipv4(errors: &mut Vec<FieldError>, loc: &str, value: &str) -> Option<Ipv4Addr> {
    if !require(errors, loc, value) {
        return None;
    }
    match value.trim().parse::<Ipv4Addr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(FieldError::new(loc, format!("{loc} field should be IPv4")));
            None
        }
    }
}

fn require_port(errors: &mut Vec<FieldError>, loc: &str, value: &str) -> Option<u16> {
    if !require(errors, loc, value) {
        return None;
    }
    match value.trim().parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            errors.push(FieldError::new(loc, format!("{loc} field should be an integer port")));
            None
        }
    }
}

/// Reject deployment targets that are the server's own addresses
///
/// # Errors
/// Returns a single-element error list when the target is reserved or not
/// a valid IPv4 address.
pub fn check_server_ip(host: &HostData, reserved: &[Ipv4Addr]) -> Result<Ipv4Addr, Vec<FieldError>> {
    let mut errors = Vec::new();
    let Some(addr) = require_ipv4(&mut errors, "client_ip", &host.client_ip) else {
        return Err(errors);
    };
    if reserved.contains(&addr) {
        return Err(vec![FieldError::new(
            "client_ip",
            "target address is reserved by the deployment server",
        )]);
    }
    Ok(addr)
}

fn descriptor_from(host: &HostData, addr: Ipv4Addr, port: u16) -> HostDescriptor {
    HostDescriptor {
        addr,
        port,
        login: host.client_login.trim().to_string(),
        password: host.client_password.trim().to_string(),
        sudo_password: host.client_sudo_password.trim().to_string(),
        hostname: host.hostname.trim().to_string(),
        site_id: host.site_id.trim().to_string(),
        uplink_interface: host.uplink_interface.trim().to_string(),
    }
}

/// Validate the credential-check subset of host data
///
/// # Errors
/// Returns every failed check; the caller forwards the list as one alert.
pub fn check_password_data(host: &HostData) -> Result<HostDescriptor, Vec<FieldError>> {
    let mut errors = Vec::new();

    require(&mut errors, "client_login", &host.client_login);
    require(&mut errors, "client_password", &host.client_password);
    require(&mut errors, "client_sudo_password", &host.client_sudo_password);
    let addr = require_ipv4(&mut errors, "client_ip", &host.client_ip);
    let port = require_port(&mut errors, "client_port", &host.client_port);

    match (addr, port) {
        (Some(addr), Some(port)) if errors.is_empty() => Ok(descriptor_from(host, addr, port)),
        _ => Err(errors),
    }
}

/// Validate the full host data required for deployment
///
/// # Errors
/// Returns every failed check; the caller forwards the list as one alert.
pub fn check_install_data(host: &HostData) -> Result<HostDescriptor, Vec<FieldError>> {
    let mut errors = Vec::new();

    require(&mut errors, "client_login", &host.client_login);
    require(&mut errors, "client_password", &host.client_password);
    require(&mut errors, "client_sudo_password", &host.client_sudo_password);
    require(&mut errors, "hostname", &host.hostname);
    require(&mut errors, "site_id", &host.site_id);
    if host.uplink_interface.trim().is_empty() {
        errors.push(FieldError::new("uplink_interface", "choose uplink interface"));
    }
    let addr = require_ipv4(&mut errors, "client_ip", &host.client_ip);
    let port = require_port(&mut errors, "client_port", &host.client_port);

    match (addr, port) {
        (Some(addr), Some(port)) if errors.is_empty() => Ok(descriptor_from(host, addr, port)),
        _ => Err(errors),
    }
}

/// Validate the DHCP block
///
/// # Errors
/// Returns every failed check; the caller forwards the list as one alert.
pub fn check_dhcp_data(dhcp: &DhcpConfig) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    require_ipv4(&mut errors, "dhcp_network", &dhcp.dhcp_network);
    require_ipv4(&mut errors, "dhcp_mask", &dhcp.dhcp_mask);
    require_ipv4(&mut errors, "dhcp_range_start", &dhcp.dhcp_range_start);
    require_ipv4(&mut errors, "dhcp_range_end", &dhcp.dhcp_range_end);
    require_ipv4(&mut errors, "dhcp_dns", &dhcp.dhcp_dns);
    require_ipv4(&mut errors, "dhcp_gateway", &dhcp.dhcp_gateway);
    require_ipv4(&mut errors, "dhcp_broadcast", &dhcp.dhcp_broadcast);
    require(&mut errors, "domain_name", &dhcp.domain_name);
    if dhcp.dhcp_interface.trim().is_empty() {
        errors.push(FieldError::new("dhcp_interface", "choose dhcp interface"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_host() -> HostData {
        HostData {
            client_ip: "192.168.1.20".to_string(),
            client_port: "22".to_string(),
            client_login: "deploy".to_string(),
            client_password: "secret".to_string(),
            client_sudo_password: "secret".to_string(),
            hostname: "edge-01".to_string(),
            site_id: "42".to_string(),
            uplink_interface: "eth0".to_string(),
        }
    }

    #[test]
    fn password_data_accepts_valid_input() {
        let descriptor = check_password_data(&valid_host()).unwrap();
        assert_eq!(descriptor.addr, "192.168.1.20".parse::<Ipv4Addr>().unwrap());
        assert_eq!(descriptor.port, 22);
        assert_eq!(descriptor.login, "deploy");
    }

    #[test]
    fn password_data_collects_all_failures() {
        let host = HostData {
            client_ip: "not-an-ip".to_string(),
            client_login: String::new(),
            ..valid_host()
        };
        let errors = check_password_data(&host).unwrap_err();
        let locs: Vec<&str> = errors.iter().map(|e| e.loc.as_str()).collect();
        assert!(locs.contains(&"client_login"));
        assert!(locs.contains(&"client_ip"));
    }

    #[test]
    fn install_data_requires_hostname_and_uplink() {
        let host = HostData {
            hostname: "  ".to_string(),
            uplink_interface: String::new(),
            ..valid_host()
        };
        let errors = check_install_data(&host).unwrap_err();
        let locs: Vec<&str> = errors.iter().map(|e| e.loc.as_str()).collect();
        assert!(locs.contains(&"hostname"));
        assert!(locs.contains(&"uplink_interface"));
    }

    #[test]
    fn reserved_server_ip_is_rejected() {
        let reserved = vec!["192.168.1.20".parse().unwrap()];
        let errors = check_server_ip(&valid_host(), &reserved).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].loc, "client_ip");
    }

    #[test]
    fn dhcp_data_checks_every_address_field() {
        let dhcp = DhcpConfig {
            dhcp_status: true,
            dhcp_network: "10.0.0.0".to_string(),
            dhcp_mask: "255.255.255.0".to_string(),
            dhcp_range_start: "10.0.0.10".to_string(),
            dhcp_range_end: "bad".to_string(),
            dhcp_dns: "8.8.8.8".to_string(),
            domain_name: String::new(),
            dhcp_gateway: "10.0.0.1".to_string(),
            dhcp_broadcast: "10.0.0.255".to_string(),
            dhcp_interface: "eth1".to_string(),
        };
        let errors = check_dhcp_data(&dhcp).unwrap_err();
        let locs: Vec<&str> = errors.iter().map(|e| e.loc.as_str()).collect();
        assert!(locs.contains(&"dhcp_range_end"));
        assert!(locs.contains(&"domain_name"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn install_list_splits_on_whitespace() {
        let request: crate::requests::DeployRequest = serde_json::from_value(serde_json::json!({
            "host_data": {},
            "install_list": "  nginx  curl\nhtop "
        }))
        .unwrap();
        assert_eq!(request.packages(), vec!["nginx", "curl", "htop"]);
    }
}
