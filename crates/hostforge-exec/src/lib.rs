//! hostforge-exec: External execution backends
//!
//! Provides the out-of-process automation runner and the SSH credential
//! probe behind trait seams so the engine can be tested without a network.

pub mod error;
pub mod probe;
pub mod result;
pub mod runner;
pub mod traits;

pub use error::ExecError;
pub use probe::SshProbe;
pub use result::{ProbeReport, ProbeTarget, RunOutput};
pub use runner::AnsibleRunner;
pub use traits::{SudoProbe, TaskRunner};
