//! Error types for hostforge-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while probing a host or invoking the runner
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Failed to reach the remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Host reachable but credentials rejected
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Operation exceeded its deadline
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// Failed to spawn the runner process
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O failure during execution
    #[error("I/O error: {0}")]
    IoError(String),
}
