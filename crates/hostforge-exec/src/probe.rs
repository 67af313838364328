//! SSH credential probe using the russh crate
//!
//! Opens a password-authenticated session, requests the elevated-privilege
//! capability listing over a pty (feeding the sudo password on stdin), and
//! enumerates the host's network interfaces.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::{ChannelMsg, Disconnect, client};
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::error::ExecError;
use crate::result::{ProbeReport, ProbeTarget};
use crate::traits::SudoProbe;

/// SSH client handler for russh
#[derive(Debug)]
struct ProbeClientHandler;

impl client::Handler for ProbeClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Accept all server keys (like StrictHostKeyChecking=no); the probe
        // targets freshly installed hosts with no known_hosts entry yet
        Ok(true)
    }
}

/// Password-authenticated SSH probe
///
/// A new connection is opened per probe; nothing is cached between attempts.
#[derive(Debug, Clone)]
pub struct SshProbe {
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl SshProbe {
    /// Probe with the default deadlines (10s connect, 8s per command)
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(8),
        }
    }

    /// Override both deadlines
    #[must_use]
    pub fn with_timeouts(connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout,
        }
    }

    #[instrument(skip(self, target), fields(host = %target.host))]
    async fn connect(
        &self,
        target: &ProbeTarget,
    ) -> Result<client::Handle<ProbeClientHandler>, ExecError> {
        let config = Arc::new(client::Config::default());

        info!(
            host = %target.host,
            port = target.port,
            user = %target.user,
            "probing SSH"
        );

        let connect = client::connect(
            config,
            (&target.host[..], target.port),
            ProbeClientHandler,
        );
        let mut session = timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| ExecError::Timeout {
                timeout: self.connect_timeout,
            })?
            .map_err(|e| ExecError::ConnectionFailed(e.to_string()))?;

        let auth_res = session
            .authenticate_password(&target.user, &target.password)
            .await
            .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

        if !auth_res.success() {
            return Err(ExecError::AuthenticationFailed(
                "password authentication rejected".to_string(),
            ));
        }

        Ok(session)
    }

    /// Run one command over a fresh pty channel, optionally feeding a line
    /// of input, and collect the full output
    async fn run_command(
        &self,
        session: &mut client::Handle<ProbeClientHandler>,
        cmd: &str,
        stdin_line: Option<&str>,
    ) -> Result<String, ExecError> {
        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        // A pty is required for sudo to accept the password on stdin
        channel
            .request_pty(false, "xterm", 80, 24, 0, 0, &[])
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        if let Some(line) = stdin_line {
            let payload = format!("{line}\n");
            channel
                .data(payload.as_bytes())
                .await
                .map_err(|e| ExecError::IoError(e.to_string()))?;
        }

        let collect = async {
            let mut output = Vec::new();
            loop {
                match channel.wait().await {
                    Some(ChannelMsg::Data { data }) => output.extend_from_slice(&data),
                    Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                        output.extend_from_slice(&data);
                    }
                    Some(ChannelMsg::Eof) | None => break,
                    _ => {}
                }
            }
            String::from_utf8_lossy(&output).to_string()
        };

        let output = timeout(self.command_timeout, collect)
            .await
            .map_err(|_| ExecError::Timeout {
                timeout: self.command_timeout,
            })?;

        debug!(command = %cmd, bytes = output.len(), "probe command completed");

        Ok(output)
    }
}

impl Default for SshProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SudoProbe for SshProbe {
    #[instrument(skip(self, target), fields(host = %target.host))]
    async fn probe(&self, target: &ProbeTarget) -> Result<ProbeReport, ExecError> {
        let mut session = self.connect(target).await?;

        let sudo_listing = self
            .run_command(&mut session, "sudo -l", Some(&target.sudo_password))
            .await?;
        let interfaces_raw = self
            .run_command(&mut session, "ls /sys/class/net/", None)
            .await?;

        session
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        Ok(ProbeReport {
            sudo_listing,
            interfaces_raw,
        })
    }
}

#[cfg(test)]
mod tests {
    // Probing needs a live SSH server; exercised through the mock
    // `SudoProbe` implementations in hostforge-core's integration tests.
    #[tokio::test]
    #[ignore = "requires SSH server"]
    async fn probe_against_live_host() {}
}
