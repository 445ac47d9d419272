//! Server configuration management

use anyhow::{Context, Result, anyhow};
use common::{DetailBackend, EnumerationBackend};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind the control socket on
    pub host: String,
    /// TCP port of the control socket
    pub port: u16,
    pub log_level: String,
    /// Cap on concurrently handled connections; excess queues at the acceptor
    #[serde(default = "ServerSettings::default_max_connections")]
    pub max_connections: usize,
    /// Ceiling in seconds on each enumeration or attach operation
    #[serde(default = "ServerSettings::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerSettings {
    fn default_max_connections() -> usize {
        64
    }

    fn default_request_timeout_secs() -> u64 {
        30
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Enumeration back-end (`usbip` or `libusb`)
    #[serde(default)]
    pub enumeration: EnumerationBackend,
    /// Detail-enrichment back-end (`udev` or `libusb`)
    #[serde(default)]
    pub details: DetailBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "localhost".to_string(),
                port: 5000,
                log_level: "info".to_string(),
                max_connections: ServerSettings::default_max_connections(),
                request_timeout_secs: ServerSettings::default_request_timeout_secs(),
            },
            usb: UsbSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usbshare/server.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Default config path: `~/.config/usbshare/server.toml`
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbshare").join("server.toml")
        } else {
            PathBuf::from(".config/usbshare/server.toml")
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow!("server.host must not be empty"));
        }
        if self.server.max_connections == 0 {
            return Err(anyhow!("server.max_connections must be at least 1"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(anyhow!("server.request_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.max_connections, 64);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.usb.enumeration, EnumerationBackend::Usbip);
        assert_eq!(config.usb.details, DetailBackend::Udev);
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.toml");

        let mut config = ServerConfig::default();
        config.server.port = 6000;
        config.usb.enumeration = EnumerationBackend::Libusb;
        config.save(&path).unwrap();

        let loaded = ServerConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.server.port, 6000);
        assert_eq!(loaded.usb.enumeration, EnumerationBackend::Libusb);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.toml");
        fs::write(
            &path,
            "[server]\nhost = \"0.0.0.0\"\nport = 5000\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let config = ServerConfig::load(Some(path)).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_connections, 64);
        assert_eq!(config.usb.enumeration, EnumerationBackend::Usbip);
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.toml");
        fs::write(
            &path,
            "[server]\nhost = \"localhost\"\nport = 5000\nlog_level = \"info\"\nmax_connections = 0\n",
        )
        .unwrap();

        assert!(ServerConfig::load(Some(path)).is_err());
    }
}
