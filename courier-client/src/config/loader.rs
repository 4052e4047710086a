//! Configuration loader

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use courier_utils::{config_file, CourierError, Result};

use super::{ClientConfig, ConfigHandle};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<ClientConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(ClientConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<ClientConfig> {
        if !path.exists() {
            return Err(CourierError::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| CourierError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<ClientConfig> {
        toml::from_str(content).map_err(|e| CourierError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &ClientConfig) -> Result<()> {
        let transport = &config.transport;

        if transport.read_buffer_size == 0 || transport.write_buffer_size == 0 {
            return Err(CourierError::config("socket buffer sizes must be non-zero"));
        }

        if transport.recv_timeout_ms == 0 {
            return Err(CourierError::config("recv_timeout_ms must be at least 1"));
        }

        if transport.send_queue_capacity == 0 {
            return Err(CourierError::config("send_queue_capacity must be at least 1"));
        }

        let mut seen = HashSet::new();
        for entry in &config.dispatchers {
            if entry.port == 0 {
                return Err(CourierError::config(format!(
                    "dispatcher {} has port 0",
                    entry.id
                )));
            }
            if entry.host.is_empty() {
                return Err(CourierError::config(format!(
                    "dispatcher {} has an empty host",
                    entry.id
                )));
            }
            if !seen.insert(entry.id) {
                return Err(CourierError::config(format!(
                    "dispatcher {} is defined more than once",
                    entry.id
                )));
            }
        }

        Ok(())
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<ClientConfig> {
        let config = Self::load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load a file, validate it and swap it into a live handle.
    ///
    /// On failure the handle keeps its previous configuration.
    pub fn reload(path: &Path, handle: &ConfigHandle) -> Result<()> {
        let config = Self::load_from_path(path)?;
        Self::validate(&config)?;
        handle.store(Arc::new(config));
        tracing::info!(path = %path.display(), "Configuration reloaded");
        Ok(())
    }
}
