//! Configuration for flatdb
//!
//! Centralized configuration with sensible defaults. The server binary
//! populates this from CLI arguments and/or a JSON configuration file
//! holding `HOST`, `PORT`, and `DATA_FOLDER`.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{DbError, Result};

/// Main configuration for a flatdb server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {database}/
    ///           ├── db_conf.json
    ///           ├── {table}.data         (newline-delimited JSON records)
    ///           └── {table}.schema.json
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./flatdb_data"),
            listen_addr: "127.0.0.1:9000".to_string(),
            max_connections: 1024,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from a JSON file with `HOST`, `PORT`, and
    /// `DATA_FOLDER` keys. Unknown keys are ignored; missing keys keep
    /// their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|_| DbError::ConfigFileNotFound {
            file_path: path.display().to_string(),
        })?;

        let parsed: Value =
            serde_json::from_str(&raw).map_err(|_| DbError::InvalidConfigFile {
                file_path: path.display().to_string(),
            })?;

        let mut config = Config::default();

        if let Some(folder) = parsed.get("DATA_FOLDER").and_then(Value::as_str) {
            config.data_dir = PathBuf::from(folder);
        }

        let host = parsed
            .get("HOST")
            .and_then(Value::as_str)
            .unwrap_or("127.0.0.1")
            .to_string();
        if let Some(port) = parsed.get("PORT").and_then(Value::as_u64) {
            config.listen_addr = format!("{host}:{port}");
        }

        Ok(config)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all databases)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
