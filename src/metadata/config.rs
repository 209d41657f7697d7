//! Configuration for metadata storage backends

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

use crate::error::StoreError;
use crate::metadata::{mock_store::MockMetadataStore, sqlite_store::SQLiteMetadataStore, MetadataStore};
use crate::service::orphan_ledger::OrphanJournal;

/// Available metadata storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetadataBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for MetadataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(MetadataBackend::SQLite),
            "mock" => Ok(MetadataBackend::Mock),
            _ => Err(format!("Unknown metadata backend: {}", s)),
        }
    }
}

/// Metadata store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataStoreConfig {
    /// Metadata backend type
    pub backend: MetadataBackend,
    /// Database file path
    pub db_path: String,
}

impl Default for MetadataStoreConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::default(),
            db_path: "./data/metadata.db".to_string(),
        }
    }
}

impl MetadataStoreConfig {
    /// Override the backend from the `METADATA_BACKEND` environment variable
    pub fn apply_env(&mut self) {
        match env::var("METADATA_BACKEND") {
            Ok(backend_str) => match backend_str.parse::<MetadataBackend>() {
                Ok(backend) => {
                    info!("Using metadata backend from environment: {:?}", backend);
                    self.backend = backend;
                }
                Err(e) => {
                    warn!("Invalid metadata backend in environment: {}. Keeping {:?}.", e, self.backend);
                }
            },
            Err(_) => {
                info!("No metadata backend specified in environment, using {:?}", self.backend);
            }
        }
    }

    /// Create a metadata storage instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn MetadataStore>, StoreError> {
        self.create_store_with_journal().map(|(store, _)| store)
    }

    /// Create the metadata store together with the orphan journal it hosts,
    /// if the backend is durable
    pub fn create_store_with_journal(
        &self,
    ) -> Result<(Arc<dyn MetadataStore>, Option<Arc<dyn OrphanJournal>>), StoreError> {
        match self.backend {
            MetadataBackend::SQLite => {
                info!("Creating SQLite metadata store at {}", self.db_path);
                let store = Arc::new(SQLiteMetadataStore::open(&self.db_path)?);
                let journal: Arc<dyn OrphanJournal> = store.clone();
                let store: Arc<dyn MetadataStore> = store;
                Ok((store, Some(journal)))
            }
            MetadataBackend::Mock => {
                info!("Creating Mock metadata store");
                let store: Arc<dyn MetadataStore> = Arc::new(MockMetadataStore::new());
                Ok((store, None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_metadata_backend_from_str() {
        assert_eq!("sqlite".parse::<MetadataBackend>().unwrap(), MetadataBackend::SQLite);
        assert_eq!("SQLite".parse::<MetadataBackend>().unwrap(), MetadataBackend::SQLite);
        assert_eq!("mock".parse::<MetadataBackend>().unwrap(), MetadataBackend::Mock);
        assert_eq!("MOCK".parse::<MetadataBackend>().unwrap(), MetadataBackend::Mock);

        assert!("firestore".parse::<MetadataBackend>().is_err());
    }

    #[test]
    fn test_metadata_config_default() {
        let config = MetadataStoreConfig::default();
        assert_eq!(config.backend, MetadataBackend::SQLite);
    }

    #[test]
    #[serial]
    fn test_metadata_config_from_env() {
        let mut config = MetadataStoreConfig::default();

        env::set_var("METADATA_BACKEND", "mock");
        config.apply_env();
        assert_eq!(config.backend, MetadataBackend::Mock);

        env::set_var("METADATA_BACKEND", "invalid");
        config.apply_env();
        assert_eq!(config.backend, MetadataBackend::Mock);

        env::remove_var("METADATA_BACKEND");
        config.apply_env();
        assert_eq!(config.backend, MetadataBackend::Mock);
    }

    #[tokio::test]
    async fn test_create_store() {
        let dir = TempDir::new().unwrap();
        let config = MetadataStoreConfig {
            backend: MetadataBackend::SQLite,
            db_path: dir.path().join("metadata.db").to_string_lossy().to_string(),
        };
        let (store, journal) = config.create_store_with_journal().unwrap();
        assert!(store.list_all_records().await.unwrap().is_empty());
        assert!(journal.unwrap().load_orphans().unwrap().is_empty());

        let config = MetadataStoreConfig {
            backend: MetadataBackend::Mock,
            ..MetadataStoreConfig::default()
        };
        let (store, journal) = config.create_store_with_journal().unwrap();
        assert!(store.list_all_records().await.unwrap().is_empty());
        assert!(journal.is_none());
        assert!(config.create_store().is_ok());
    }
}
