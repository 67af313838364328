//! Configuration loading and types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use hostforge_core::Settings;

/// Top-level configuration for the hostforge daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon server settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Deployment engine settings
    #[serde(default)]
    pub engine: Settings,
}

/// Daemon server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address and port to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &PathBuf) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from default paths or use defaults
    ///
    /// # Errors
    /// Returns error if a file was found but cannot be parsed
    pub fn load_default() -> eyre::Result<Self> {
        // Check environment variable
        if let Ok(path) = std::env::var("HOSTFORGE_CONFIG") {
            return Self::load(&PathBuf::from(path));
        }

        // Try common paths
        let paths = [
            PathBuf::from("hostforge.toml"),
            PathBuf::from("/etc/hostforge/hostforge.toml"),
            dirs::config_dir()
                .map(|p| p.join("hostforge/hostforge.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::warn!("no config file found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.bind, "127.0.0.1:8000");
        assert_eq!(config.daemon.log_level, "info");
        assert!(!config.engine.wait_for_installs);
    }

    #[test]
    fn engine_section_is_forwarded() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            bind = "0.0.0.0:9000"

            [engine]
            reserved_ips = ["198.51.100.1"]
            task_timeout_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.daemon.bind, "0.0.0.0:9000");
        assert_eq!(config.engine.reserved_ips.len(), 1);
        assert_eq!(config.engine.task_timeout_secs, 120);
    }
}
