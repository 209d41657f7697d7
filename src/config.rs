//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use log::{info, warn};

use crate::blob::config::BlobStoreConfig;
use crate::catalog::index::DEFAULT_PAGE_SIZE;
use crate::controller::SessionLimits;
use crate::metadata::config::MetadataStoreConfig;
use crate::service::ReconciliationConfig;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "CATALOG_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Blob store configuration
    pub blob: BlobStoreConfig,
    /// Metadata store configuration
    pub metadata: MetadataStoreConfig,
    /// Gallery session configuration
    pub gallery: GalleryConfig,
    /// Orphan reconciliation worker configuration
    pub reconciliation: ReconciliationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Maximum payload size in bytes
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9710,
            workers: 4,
            max_payload_size: 32 * 1024 * 1024,
        }
    }
}

/// Where gallery sessions load their snapshot from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CatalogSourceKind {
    /// Live listing from the metadata store
    #[default]
    Metadata,
    /// Static per-category JSON files
    Seed,
}

/// Gallery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Initial window and load-more increment
    pub page_size: usize,
    pub source: CatalogSourceKind,
    /// Directory of `{Category}.json` files, used with the `Seed` source
    pub seed_dir: String,
    /// Idle seconds after which a session is dropped
    pub session_idle_secs: u64,
    /// Live sessions kept at most; the least recently used goes first
    pub max_sessions: usize,
}

impl GalleryConfig {
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            idle_ttl: Duration::from_secs(self.session_idle_secs),
            max_sessions: self.max_sessions,
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            source: CatalogSourceKind::Metadata,
            seed_dir: "./data/seed".to_string(),
            session_idle_secs: 30 * 60,
            max_sessions: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to log configuration file
    pub config_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: "server_log.yaml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, use defaults if not found.
    /// Backend environment overrides are applied either way.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file, use defaults if not found
    pub fn load_from(config_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if Path::new(config_path).exists() {
            let content = fs::read_to_string(config_path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", config_path);
            Ok(config)
        } else {
            warn!("Config file {} not found, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Apply `BLOB_BACKEND` / `METADATA_BACKEND` overrides
    pub fn apply_env(&mut self) {
        self.blob.apply_env();
        self.metadata.apply_env();
    }
}
