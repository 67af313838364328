//! Core error types for hostforge-core

use thiserror::Error;

/// Errors that can occur in engine operations
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// No inventory record exists for the host
    #[error("inventory record not found for host: {0}")]
    InventoryNotFound(String),

    /// Staging or log file I/O failure
    #[error("I/O error: {0}")]
    IoError(String),
}
