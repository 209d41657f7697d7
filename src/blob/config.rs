//! Configuration for blob storage backends

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

use crate::blob::{local_store::LocalBlobStore, mock_store::MockBlobStore, BlobStore};

/// Available blob storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlobBackend {
    #[default]
    Local,
    Mock,
}

impl std::str::FromStr for BlobBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(BlobBackend::Local),
            "mock" => Ok(BlobBackend::Mock),
            _ => Err(format!("Unknown blob backend: {}", s)),
        }
    }
}

/// Blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobStoreConfig {
    /// Blob backend type
    pub backend: BlobBackend,
    /// Directory holding blob files (local backend)
    pub base_path: String,
    /// Prefix of the URLs issued for stored blobs
    pub public_base_url: String,
    /// Largest accepted blob in bytes
    pub max_blob_size: u64,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            base_path: "./data/blobs".to_string(),
            public_base_url: "http://127.0.0.1:9710/blobs".to_string(),
            max_blob_size: 25 * 1024 * 1024,
        }
    }
}

impl BlobStoreConfig {
    /// Override the backend from the `BLOB_BACKEND` environment variable
    pub fn apply_env(&mut self) {
        match env::var("BLOB_BACKEND") {
            Ok(backend_str) => match backend_str.parse::<BlobBackend>() {
                Ok(backend) => {
                    info!("Using blob backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => {
                    warn!("Invalid blob backend in environment: {}. Keeping {:?}.", e, self.backend);
                }
            },
            Err(_) => {
                info!("No blob backend specified in environment, using {:?}", self.backend);
            }
        }
    }

    /// Create a blob store instance based on the configuration
    pub fn create_store(&self) -> Arc<dyn BlobStore> {
        match self.backend {
            BlobBackend::Local => Arc::new(LocalBlobStore::new(self)),
            BlobBackend::Mock => {
                info!("Using mock blob backend");
                Arc::new(MockBlobStore::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_blob_backend_from_str() {
        assert_eq!("local".parse::<BlobBackend>().unwrap(), BlobBackend::Local);
        assert_eq!("LOCAL".parse::<BlobBackend>().unwrap(), BlobBackend::Local);
        assert_eq!("fs".parse::<BlobBackend>().unwrap(), BlobBackend::Local);
        assert_eq!("mock".parse::<BlobBackend>().unwrap(), BlobBackend::Mock);
        assert_eq!("Mock".parse::<BlobBackend>().unwrap(), BlobBackend::Mock);

        assert!("s3".parse::<BlobBackend>().is_err());
    }

    #[test]
    fn test_blob_config_default() {
        let config = BlobStoreConfig::default();
        assert_eq!(config.backend, BlobBackend::Local);
        assert!(config.max_blob_size > 0);
    }

    #[test]
    #[serial]
    fn test_blob_config_from_env() {
        let mut config = BlobStoreConfig::default();

        env::set_var("BLOB_BACKEND", "mock");
        config.apply_env();
        assert_eq!(config.backend, BlobBackend::Mock);

        // Invalid values keep the current backend
        env::set_var("BLOB_BACKEND", "invalid");
        config.apply_env();
        assert_eq!(config.backend, BlobBackend::Mock);

        env::remove_var("BLOB_BACKEND");
    }
}
