//! Process-wide inventory store
//!
//! Maps host address to the execution context every task against that host
//! consumes. Records are written once, at credential verification (or at
//! deployment start when absent), and read-only afterward.
//!
//! Sharp edge, kept deliberately: the store is process-wide and keyed by
//! host address, so two concurrent sessions targeting the same address share
//! the same record. Benign when their descriptors are identical; callers
//! must treat a record written after their own `put` as authoritative only
//! within their own session.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use hostforge_api::HostDescriptor;

use crate::error::CoreError;

/// Per-host execution context consumed by the runner
#[derive(Debug, Clone)]
pub struct InventoryRecord {
    /// Host address this record belongs to
    pub host_key: Ipv4Addr,
    /// Site identity label, used in log lines and artifact names
    pub site_id: String,
    /// Rendered inventory text
    pub rendered: String,
    /// Staging file holding `rendered`, passed to the runner
    pub path: PathBuf,
}

/// Render the single inventory line the runner consumes
#[must_use]
pub fn render_inventory(host: &HostDescriptor) -> String {
    format!(
        "{addr} ansible_user={login} ansible_host={addr} ansible_port={port} \
         ansible_password={password} ansible_become_pass={sudo} \
         ansible_connection=paramiko ansible_python_interpreter=/usr/bin/python3",
        addr = host.addr,
        login = host.login,
        port = host.port,
        password = host.password,
        sudo = host.sudo_password,
    )
}

/// Process-wide map from host address to inventory record
pub struct InventoryStore {
    staging_dir: PathBuf,
    records: RwLock<HashMap<Ipv4Addr, Arc<InventoryRecord>>>,
}

impl InventoryStore {
    /// Store writing its record files under `staging_dir`
    #[must_use]
    pub fn new(staging_dir: PathBuf) -> Self {
        Self {
            staging_dir,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create or overwrite the record for the host, persisting the rendered
    /// context to the staging directory
    ///
    /// # Errors
    /// Returns `CoreError::IoError` when the staging file cannot be written.
    pub async fn put(&self, host: &HostDescriptor) -> Result<Arc<InventoryRecord>, CoreError> {
        let rendered = render_inventory(host);
        let file_name = format!("{}_{}_inventory", host.addr, host.site_id);
        let path = self.staging_dir.join(file_name);

        tokio::fs::write(&path, &rendered)
            .await
            .map_err(|e| CoreError::IoError(e.to_string()))?;

        let record = Arc::new(InventoryRecord {
            host_key: host.addr,
            site_id: host.site_id.clone(),
            rendered,
            path,
        });

        self.records
            .write()
            .await
            .insert(host.addr, record.clone());

        info!(host = %host.addr, "inventory record created");

        Ok(record)
    }

    /// Current record for the host
    ///
    /// # Errors
    /// Returns `CoreError::InventoryNotFound` when no record exists.
    pub async fn get(&self, host_key: Ipv4Addr) -> Result<Arc<InventoryRecord>, CoreError> {
        self.records
            .read()
            .await
            .get(&host_key)
            .cloned()
            .ok_or_else(|| CoreError::InventoryNotFound(host_key.to_string()))
    }

    /// Whether a record exists for the host
    pub async fn contains(&self, host_key: Ipv4Addr) -> bool {
        self.records.read().await.contains_key(&host_key)
    }
}
