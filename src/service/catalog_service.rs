//! Catalog service: the consistency boundary between the blob store and the
//! metadata store.
//!
//! Neither store offers a transaction spanning both, so ingestion and
//! deletion run as two-step sagas. Each step is attempted once; a failure in
//! the second step leaves an orphaned blob, which is reported in the error
//! and recorded in the orphan ledger instead of being rolled back.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::blob::BlobStore;
use crate::catalog::CatalogSource;
use crate::error::{CatalogError, Stage, StoreError};
use crate::metadata::MetadataStore;
use crate::model::{blob_path, new_asset_id, Category, MediaAsset};
use crate::service::orphan_ledger::{OrphanBlob, OrphanCause, OrphanLedger};

/// Sole writer of both stores
pub struct CatalogService {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    orphans: Arc<OrphanLedger>,
    // Serializes deletions so a repeated delete observes NotFound
    delete_gate: AsyncMutex<()>,
    last_created_at: Mutex<Option<DateTime<Utc>>>,
}

impl CatalogService {
    /// Create a new catalog service with injected store backends
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self::with_ledger(blobs, metadata, Arc::new(OrphanLedger::new()))
    }

    pub fn with_ledger(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        orphans: Arc<OrphanLedger>,
    ) -> Self {
        Self {
            blobs,
            metadata,
            orphans,
            delete_gate: AsyncMutex::new(()),
            last_created_at: Mutex::new(None),
        }
    }

    pub fn orphans(&self) -> &Arc<OrphanLedger> {
        &self.orphans
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn metadata_store(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }

    // Creation timestamps never go backwards, even if the wall clock does.
    // Microsecond precision is what every metadata backend keeps.
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let mut last = self.last_created_at.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    /// Ingestion saga: write the blob, then the metadata record.
    ///
    /// On success the returned record is durable in both stores; the caller
    /// inserts it into its own index. On failure the metadata store is
    /// unchanged.
    pub async fn ingest(
        &self,
        data: &[u8],
        category: Category,
        file_name: Option<&str>,
    ) -> Result<MediaAsset, CatalogError> {
        let id = new_asset_id();
        let created_at = self.next_created_at();
        let destination = blob_path(category, &id, created_at, data, file_name);
        debug!("Ingesting {} bytes into {}", data.len(), destination);

        let blob_ref = self
            .blobs
            .store_blob(data, &destination)
            .await
            .map_err(|source| {
                error!("Blob write failed for {}: {}", destination, source);
                CatalogError::IngestFailed {
                    stage: Stage::Blob,
                    source,
                    orphan: None,
                }
            })?;

        let record = MediaAsset {
            id,
            category,
            blob_ref,
            created_at,
        };
        log_mdc::insert("asset", &record.id);
        let result = self.commit_record(record).await;
        log_mdc::remove("asset");
        result
    }

    async fn commit_record(&self, record: MediaAsset) -> Result<MediaAsset, CatalogError> {
        if let Err(source) = self.metadata.put_record(&record).await {
            let orphan = OrphanBlob::new(record.blob_ref.clone(), record.id.clone(), OrphanCause::IngestMetadataFailed);
            error!(
                "Metadata write failed for asset {}, blob {} is now orphaned: {}",
                record.id, record.blob_ref, source
            );
            self.orphans.record(orphan.clone());
            return Err(CatalogError::IngestFailed {
                stage: Stage::Metadata,
                source,
                orphan: Some(orphan),
            });
        }

        info!("Ingested asset {} in {} at {}", record.id, record.category, record.blob_ref);
        Ok(record)
    }

    /// Deletion saga with a blob reference captured by the caller: delete the
    /// metadata record, then the blob.
    pub async fn delete_asset(&self, id: &str, blob_ref: &str) -> Result<(), CatalogError> {
        let _gate = self.delete_gate.lock().await;
        self.delete_locked(id, blob_ref).await
    }

    /// Deletion saga that first looks up the blob reference by id
    pub async fn delete_by_id(&self, id: &str) -> Result<MediaAsset, CatalogError> {
        let _gate = self.delete_gate.lock().await;
        let record = self.metadata.get_record(id).await.map_err(|source| match source {
            StoreError::NotFound(_) => CatalogError::NotFound(id.to_string()),
            source => CatalogError::DeleteFailed {
                stage: Stage::Metadata,
                partial: false,
                source,
                orphan: None,
            },
        })?;
        self.delete_locked(&record.id, &record.blob_ref).await?;
        Ok(record)
    }

    async fn delete_locked(&self, id: &str, blob_ref: &str) -> Result<(), CatalogError> {
        log_mdc::insert("asset", id);
        let result = self.delete_both(id, blob_ref).await;
        log_mdc::remove("asset");
        result
    }

    async fn delete_both(&self, id: &str, blob_ref: &str) -> Result<(), CatalogError> {
        if let Err(source) = self.metadata.delete_record(id).await {
            if source.is_not_found() {
                warn!("Delete of asset {}: no metadata record", id);
                return Err(CatalogError::NotFound(id.to_string()));
            }
            error!("Metadata delete failed for asset {}: {}", id, source);
            return Err(CatalogError::DeleteFailed {
                stage: Stage::Metadata,
                partial: false,
                source,
                orphan: None,
            });
        }

        match self.blobs.delete_blob(blob_ref).await {
            Ok(()) => {
                info!("Deleted asset {} and blob {}", id, blob_ref);
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                warn!("Blob {} for asset {} was already gone", blob_ref, id);
                Ok(())
            }
            Err(source) => {
                let orphan = OrphanBlob::new(blob_ref.to_string(), id.to_string(), OrphanCause::DeleteBlobFailed);
                error!(
                    "Blob delete failed for asset {}, blob {} is now orphaned: {}",
                    id, blob_ref, source
                );
                self.orphans.record(orphan.clone());
                Err(CatalogError::DeleteFailed {
                    stage: Stage::Blob,
                    partial: true,
                    source,
                    orphan: Some(orphan),
                })
            }
        }
    }

    /// Full catalog listing from the metadata store
    pub async fn list_catalog(&self) -> Result<Vec<MediaAsset>, CatalogError> {
        self.metadata.list_all_records().await.map_err(|source| {
            error!("Catalog listing failed: {}", source);
            CatalogError::Snapshot(source)
        })
    }
}

#[async_trait]
impl CatalogSource for CatalogService {
    async fn load_snapshot(&self) -> Result<Vec<MediaAsset>, CatalogError> {
        self.list_catalog().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::mock_store::MockBlobStore;
    use crate::metadata::mock_store::MockMetadataStore;

    fn service() -> (CatalogService, MockBlobStore, MockMetadataStore) {
        let blobs = MockBlobStore::new();
        let metadata = MockMetadataStore::new();
        let service = CatalogService::new(Arc::new(blobs.clone()), Arc::new(metadata.clone()));
        (service, blobs, metadata)
    }

    #[tokio::test]
    async fn test_ingest_writes_both_stores() {
        let (service, blobs, metadata) = service();

        let asset = service.ingest(b"jpeg", Category::Portraits, Some("face.jpg")).await.unwrap();
        assert_eq!(asset.category, Category::Portraits);
        assert!(asset.blob_ref.starts_with("mock://Portraits/"));
        assert!(asset.blob_ref.ends_with("_face.jpg"));
        assert!(blobs.contains(&asset.blob_ref));
        assert!(metadata.contains(&asset.id));
        assert!(service.orphans().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_blob_failure_records_nothing() {
        let (service, blobs, metadata) = service();
        blobs.fail_writes_with(Some(StoreError::StoreUnavailable("offline".to_string())));

        let err = service.ingest(b"jpeg", Category::Food, None).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::IngestFailed { stage: Stage::Blob, source: StoreError::StoreUnavailable(_), orphan: None }
        ));
        assert_eq!(metadata.record_count(), 0);
        assert!(service.orphans().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_metadata_failure_orphans_blob() {
        let (service, blobs, metadata) = service();
        metadata.fail_puts_with(Some(StoreError::PermissionDenied("rules".to_string())));

        let err = service.ingest(b"jpeg", Category::Food, None).await.unwrap_err();
        let orphan = match err {
            CatalogError::IngestFailed {
                stage: Stage::Metadata,
                source: StoreError::PermissionDenied(_),
                orphan: Some(orphan),
            } => orphan,
            other => panic!("unexpected error: {:?}", other),
        };
        assert_eq!(orphan.cause, OrphanCause::IngestMetadataFailed);
        assert!(blobs.contains(&orphan.blob_ref));
        assert_eq!(metadata.record_count(), 0);
        assert_eq!(service.orphans().snapshot(), vec![orphan]);
    }

    #[tokio::test]
    async fn test_delete_removes_both() {
        let (service, blobs, metadata) = service();
        let asset = service.ingest(b"jpeg", Category::Street, None).await.unwrap();

        service.delete_asset(&asset.id, &asset.blob_ref).await.unwrap();
        assert!(!metadata.contains(&asset.id));
        assert!(!blobs.contains(&asset.blob_ref));
    }

    #[tokio::test]
    async fn test_delete_metadata_failure_changes_nothing() {
        let (service, blobs, metadata) = service();
        let asset = service.ingest(b"jpeg", Category::Street, None).await.unwrap();
        metadata.fail_deletes_with(Some(StoreError::StoreUnavailable("offline".to_string())));

        let err = service.delete_asset(&asset.id, &asset.blob_ref).await.unwrap_err();
        assert!(matches!(err, CatalogError::DeleteFailed { stage: Stage::Metadata, partial: false, .. }));
        assert!(metadata.contains(&asset.id));
        assert!(blobs.contains(&asset.blob_ref));
    }

    #[tokio::test]
    async fn test_second_delete_reports_not_found() {
        let (service, _blobs, _metadata) = service();
        let asset = service.ingest(b"jpeg", Category::Events, None).await.unwrap();

        service.delete_by_id(&asset.id).await.unwrap();
        assert!(matches!(service.delete_by_id(&asset.id).await, Err(CatalogError::NotFound(_))));
        assert!(matches!(
            service.delete_asset(&asset.id, &asset.blob_ref).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_blob() {
        let (service, blobs, metadata) = service();
        let asset = service.ingest(b"jpeg", Category::Events, None).await.unwrap();
        blobs.clear();

        service.delete_asset(&asset.id, &asset.blob_ref).await.unwrap();
        assert!(!metadata.contains(&asset.id));
        assert!(service.orphans().is_empty());
    }

    #[tokio::test]
    async fn test_created_at_is_non_decreasing() {
        let (service, _blobs, _metadata) = service();
        let mut previous = None;
        for _ in 0..20 {
            let asset = service.ingest(b"jpeg", Category::Food, None).await.unwrap();
            if let Some(previous) = previous {
                assert!(asset.created_at >= previous);
            }
            previous = Some(asset.created_at);
        }
    }

    #[tokio::test]
    async fn test_asset_context_cleared_after_sagas() {
        let (service, blobs, metadata) = service();
        let asset_context_cleared = || log_mdc::get("asset", |value| value.is_none());

        let asset = service.ingest(b"jpeg", Category::Food, None).await.unwrap();
        assert!(asset_context_cleared());

        metadata.fail_puts_with(Some(StoreError::StoreUnavailable("offline".to_string())));
        assert!(service.ingest(b"jpeg", Category::Food, None).await.is_err());
        assert!(asset_context_cleared());

        blobs.fail_deletes_with(Some(StoreError::StoreUnavailable("offline".to_string())));
        assert!(service.delete_asset(&asset.id, &asset.blob_ref).await.is_err());
        assert!(asset_context_cleared());
    }

    #[tokio::test]
    async fn test_list_catalog_failure_is_reported() {
        let (service, _blobs, metadata) = service();
        metadata.fail_lists_with(Some(StoreError::StoreUnavailable("offline".to_string())));
        assert!(matches!(
            service.load_snapshot().await,
            Err(CatalogError::Snapshot(StoreError::StoreUnavailable(_)))
        ));
    }
}
