//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the TCP control socket to.
    /// Override: `HLX_BIND_ADDR`
    pub bind_addr: SocketAddr,

    /// Path to the persisted backup document.
    /// Override: `HLX_BACKUP_PATH`
    pub backup_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:23".parse().expect("valid default bind address"),
            backup_path: PathBuf::from("hlx-backup.json"),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HLX_BIND_ADDR") {
            if let Ok(addr) = val.parse() {
                self.bind_addr = addr;
            }
        }

        if let Ok(val) = std::env::var("HLX_BACKUP_PATH") {
            self.backup_path = PathBuf::from(val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_telnet_port() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 23);
    }

    #[test]
    fn env_override_replaces_bind_addr() {
        std::env::set_var("HLX_BIND_ADDR", "127.0.0.1:9999");
        let mut config = ServerConfig::default();
        config.apply_env_overrides();
        std::env::remove_var("HLX_BIND_ADDR");
        assert_eq!(config.bind_addr.port(), 9999);
    }
}
