//! Engine settings

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Process-level engine settings, usually loaded from the daemon's TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Append-only deploy log file
    #[serde(default = "default_deploy_log")]
    pub deploy_log: PathBuf,
    /// The server's own addresses, never accepted as a deployment target
    #[serde(default)]
    pub reserved_ips: Vec<Ipv4Addr>,
    /// Directory for descriptor and inventory artifacts
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    /// Public key installed for the backup agent's login
    #[serde(default = "default_backup_pubkey")]
    pub backup_pubkey: PathBuf,
    /// Backup agent payload copied onto the target
    #[serde(default = "default_backup_payload")]
    pub backup_payload: PathBuf,
    /// Credentials for application checkouts
    #[serde(default)]
    pub git: GitSettings,
    /// Per-task execution deadline, in seconds
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
    /// When true, configuration tasks wait for all package installs to
    /// finish before dispatch. Off by default: the historical behavior lets
    /// them race, and install failures surface per task either way.
    #[serde(default)]
    pub wait_for_installs: bool,
}

/// Git checkout credentials and repository owner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitSettings {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    /// Repository owner on the hosting service
    #[serde(default)]
    pub account: String,
}

fn default_deploy_log() -> PathBuf {
    PathBuf::from("deploy.log")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_backup_pubkey() -> PathBuf {
    PathBuf::from("/etc/hostforge/backup_key.pub")
}

fn default_backup_payload() -> PathBuf {
    PathBuf::from("/etc/hostforge/backup_rsync")
}

fn default_task_timeout_secs() -> u64 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deploy_log: default_deploy_log(),
            reserved_ips: Vec::new(),
            staging_dir: default_staging_dir(),
            backup_pubkey: default_backup_pubkey(),
            backup_payload: default_backup_payload(),
            git: GitSettings::default(),
            task_timeout_secs: default_task_timeout_secs(),
            wait_for_installs: false,
        }
    }
}

impl Settings {
    /// Per-task deadline as a [`Duration`]
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}
