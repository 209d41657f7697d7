//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.

use log::info;
use std::sync::Arc;

use crate::blob::mock_store::MockBlobStore;
use crate::blob::BlobStore;
use crate::catalog::{CatalogSource, SeedDirectory};
use crate::config::{AppConfig, CatalogSourceKind};
use crate::controller::{AdminController, SessionRegistry};
use crate::error::CatalogError;
use crate::metadata::mock_store::MockMetadataStore;
use crate::metadata::MetadataStore;
use crate::service::{CatalogService, OrphanLedger};

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub catalog_service: Arc<CatalogService>,
    pub sessions: Arc<SessionRegistry>,
    pub admin: Arc<AdminController>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application state with configuration");

        let blobs = config.blob.create_store();
        let (metadata, journal) = config.metadata.create_store_with_journal()?;
        let ledger = match journal {
            Some(journal) => OrphanLedger::with_journal(journal)?,
            None => OrphanLedger::new(),
        };
        let state = Self::with_ledger(config, blobs, metadata, Arc::new(ledger)).await?;

        info!("Application state initialized successfully");
        Ok(state)
    }

    /// Wire the service and controllers over explicit store backends
    pub async fn with_stores(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Result<Self, CatalogError> {
        Self::with_ledger(config, blobs, metadata, Arc::new(OrphanLedger::new())).await
    }

    pub async fn with_ledger(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        orphans: Arc<OrphanLedger>,
    ) -> Result<Self, CatalogError> {
        let catalog_service = Arc::new(CatalogService::with_ledger(blobs, metadata, orphans));

        let source: Arc<dyn CatalogSource> = match config.gallery.source {
            CatalogSourceKind::Metadata => {
                info!("Gallery sessions read from the metadata store");
                catalog_service.clone()
            }
            CatalogSourceKind::Seed => {
                info!("Gallery sessions read seed files from {}", config.gallery.seed_dir);
                Arc::new(SeedDirectory::new(&config.gallery.seed_dir))
            }
        };

        let page_size = config.gallery.page_size;
        let sessions = Arc::new(SessionRegistry::with_limits(
            source,
            page_size,
            config.gallery.session_limits(),
        ));
        let admin = Arc::new(AdminController::open(catalog_service.clone(), page_size).await?);

        Ok(Self {
            catalog_service,
            sessions,
            admin,
            config,
        })
    }

    /// Create application state for testing with mock backends
    pub async fn new_for_testing() -> Result<Self, CatalogError> {
        Self::with_stores(
            AppConfig::default(),
            Arc::new(MockBlobStore::new()),
            Arc::new(MockMetadataStore::new()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::config::BlobBackend;
    use crate::metadata::config::MetadataBackend;
    use crate::service::{OrphanBlob, OrphanCause};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_for_testing_is_empty() {
        let state = AppState::new_for_testing().await.unwrap();
        assert!(state.admin.list().is_empty());
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_from_config_with_on_disk_backends() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.blob.backend = BlobBackend::Local;
        config.blob.base_path = dir.path().join("blobs").to_string_lossy().to_string();
        config.metadata.backend = MetadataBackend::SQLite;
        config.metadata.db_path = dir.path().join("metadata.db").to_string_lossy().to_string();

        let state = AppState::from_config(config.clone()).await.unwrap();
        let asset = state.admin.ingest_requested(b"img", "Wedding", None).await.unwrap();
        assert!(asset.blob_ref.starts_with("http://127.0.0.1:9710/blobs/Wedding/"));
        assert_eq!(state.catalog_service.list_catalog().await.unwrap(), vec![asset.clone()]);

        // Orphans recorded before a restart come back with the ledger
        state.catalog_service.orphans().record(OrphanBlob::new(
            asset.blob_ref.clone(),
            asset.id.clone(),
            OrphanCause::DeleteBlobFailed,
        ));
        drop(state);

        let restarted = AppState::from_config(config).await.unwrap();
        let orphans = restarted.catalog_service.orphans().snapshot();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].blob_ref, asset.blob_ref);
    }

    #[tokio::test]
    async fn test_seed_source_feeds_sessions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Street.json"), r#"[{"id": 7, "url": "https://cdn.example/7.jpg"}]"#)
            .unwrap();
        let mut config = AppConfig::default();
        config.gallery.source = CatalogSourceKind::Seed;
        config.gallery.seed_dir = dir.path().to_string_lossy().to_string();

        let state = AppState::with_stores(config, Arc::new(MockBlobStore::new()), Arc::new(MockMetadataStore::new()))
            .await
            .unwrap();
        let (_, view) = state.sessions.create().await.unwrap();
        assert_eq!(view.visible_assets[0].id, "Street:7");
        assert!(state.admin.list().is_empty());
    }
}
