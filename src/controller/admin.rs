//! Admin screen controller: uploads, deletes and the admin listing

use log::{info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::catalog::{CatalogIndex, CatalogSource};
use crate::error::CatalogError;
use crate::model::{Category, MediaAsset};
use crate::service::CatalogService;

/// Result of an upload as reported to the admin surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<MediaAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UploadOutcome {
    pub fn from_result(result: &Result<MediaAsset, CatalogError>) -> Self {
        match result {
            Ok(asset) => Self {
                success: true,
                asset: Some(asset.clone()),
                error_kind: None,
                message: None,
            },
            Err(e) => Self {
                success: false,
                asset: None,
                error_kind: Some(e.error_kind()),
                message: Some(e.to_string()),
            },
        }
    }

    /// Failure raised before the catalog service was reached
    pub fn rejected(error_kind: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            asset: None,
            error_kind: Some(error_kind.to_string()),
            message: Some(message.into()),
        }
    }
}

/// Result of a delete as reported to the admin surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeleteOutcome {
    pub fn from_result(result: &Result<(), CatalogError>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                error_kind: None,
                message: None,
            },
            Err(e) => Self {
                success: false,
                error_kind: Some(e.error_kind()),
                message: Some(e.to_string()),
            },
        }
    }
}

pub struct AdminController {
    service: Arc<CatalogService>,
    index: Mutex<CatalogIndex>,
}

impl AdminController {
    pub fn new(service: Arc<CatalogService>, index: CatalogIndex) -> Self {
        Self {
            service,
            index: Mutex::new(index),
        }
    }

    /// Controller over a fresh snapshot of the metadata store
    pub async fn open(service: Arc<CatalogService>, page_size: usize) -> Result<Self, CatalogError> {
        let snapshot = service.load_snapshot().await?;
        Ok(Self::new(service, CatalogIndex::with_snapshot(snapshot, page_size, page_size)))
    }

    fn lock(&self) -> MutexGuard<'_, CatalogIndex> {
        self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn service(&self) -> &Arc<CatalogService> {
        &self.service
    }

    /// Validate and ingest an upload. On success the new record is added to
    /// the admin index without a refetch.
    pub async fn ingest_requested(
        &self,
        data: &[u8],
        category_label: &str,
        file_name: Option<&str>,
    ) -> Result<MediaAsset, CatalogError> {
        let category: Category = category_label.parse()?;
        if data.is_empty() {
            return Err(CatalogError::EmptyPayload);
        }

        let asset = self.service.ingest(data, category, file_name).await?;
        if !self.lock().insert(asset.clone()) {
            warn!("Asset {} was already in the admin index", asset.id);
        }
        Ok(asset)
    }

    /// Delete an asset. The admin index drops it whenever the metadata
    /// record is gone, including a partial failure at the blob stage.
    pub async fn delete_requested(&self, id: &str) -> Result<(), CatalogError> {
        let known_blob = self.lock().get(id).map(|asset| asset.blob_ref.clone());
        let result = match known_blob {
            Some(blob_ref) => self.service.delete_asset(id, &blob_ref).await,
            None => self.service.delete_by_id(id).await.map(|_| ()),
        };

        let metadata_gone = match &result {
            Ok(()) => true,
            Err(e) => e.is_partial() || matches!(e, CatalogError::NotFound(_)),
        };
        if metadata_gone && self.lock().remove(id).is_some() {
            info!("Removed asset {} from the admin index", id);
        }
        result
    }

    /// Every record the admin index knows of, in listing order
    pub fn list(&self) -> Vec<MediaAsset> {
        self.lock().records().to_vec()
    }

    /// Replace the admin index with a fresh snapshot
    pub async fn refresh(&self) -> Result<usize, CatalogError> {
        let snapshot = self.service.load_snapshot().await?;
        let count = snapshot.len();
        self.lock().replace_snapshot(snapshot);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::mock_store::MockBlobStore;
    use crate::error::StoreError;
    use crate::metadata::mock_store::MockMetadataStore;
    use crate::model::CategoryFilter;

    async fn controller() -> (AdminController, MockBlobStore, MockMetadataStore) {
        let blobs = MockBlobStore::new();
        let metadata = MockMetadataStore::new();
        let service = Arc::new(CatalogService::new(Arc::new(blobs.clone()), Arc::new(metadata.clone())));
        (AdminController::open(service, 12).await.unwrap(), blobs, metadata)
    }

    #[tokio::test]
    async fn test_upload_updates_index_in_place() {
        let (admin, _blobs, metadata) = controller().await;

        let result = admin.ingest_requested(b"img", "pre-wedding", Some("ring.jpg")).await;
        let outcome = UploadOutcome::from_result(&result);
        assert!(outcome.success);
        let asset = outcome.asset.unwrap();
        assert_eq!(asset.category, Category::PreWedding);
        assert_eq!(admin.list(), vec![asset.clone()]);
        assert!(metadata.contains(&asset.id));
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let (admin, blobs, _metadata) = controller().await;

        let unknown = admin.ingest_requested(b"img", "Landscapes", None).await;
        assert_eq!(UploadOutcome::from_result(&unknown).error_kind.as_deref(), Some("UnknownCategory"));

        let empty = admin.ingest_requested(b"", "Food", None).await;
        assert_eq!(UploadOutcome::from_result(&empty).error_kind.as_deref(), Some("EmptyPayload"));

        assert_eq!(blobs.blob_count(), 0);
        assert!(admin.list().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_index_alone() {
        let (admin, _blobs, metadata) = controller().await;
        metadata.fail_puts_with(Some(StoreError::StoreUnavailable("offline".to_string())));

        let result = admin.ingest_requested(b"img", "Food", None).await;
        let outcome = UploadOutcome::from_result(&result);
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind.as_deref(), Some("IngestFailed(stage=metadata)"));
        assert!(admin.list().is_empty());
        assert_eq!(admin.service().orphans().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_outcomes() {
        let (admin, blobs, _metadata) = controller().await;
        let kept = admin.ingest_requested(b"a", "Food", None).await.unwrap();
        let partial = admin.ingest_requested(b"b", "Food", None).await.unwrap();

        blobs.fail_deletes_with(Some(StoreError::StoreUnavailable("offline".to_string())));
        let result = admin.delete_requested(&partial.id).await;
        let outcome = DeleteOutcome::from_result(&result);
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind.as_deref(), Some("DeleteFailed(stage=blob, partial=true)"));
        assert_eq!(admin.list(), vec![kept.clone()]);

        blobs.fail_deletes_with(None);
        assert!(DeleteOutcome::from_result(&admin.delete_requested(&kept.id).await).success);
        assert!(admin.list().is_empty());

        let again = admin.delete_requested(&kept.id).await;
        assert_eq!(DeleteOutcome::from_result(&again).error_kind.as_deref(), Some("NotFound"));
    }

    #[tokio::test]
    async fn test_in_place_updates_match_a_fresh_listing_under_every_filter() {
        let (admin, _blobs, _metadata) = controller().await;
        let categories = [
            Category::Food,
            Category::Street,
            Category::Food,
            Category::Wedding,
            Category::Portraits,
            Category::Events,
            Category::PreWedding,
            Category::Street,
        ];
        let mut ingested = Vec::new();
        for (i, category) in categories.into_iter().enumerate() {
            let data = format!("img{}", i);
            ingested.push(admin.ingest_requested(data.as_bytes(), category.label(), None).await.unwrap());
        }
        let deleted = [ingested[0].id.clone(), ingested[4].id.clone()];
        for id in &deleted {
            admin.delete_requested(id).await.unwrap();
        }

        let filters = std::iter::once(CategoryFilter::All).chain(Category::ALL.into_iter().map(CategoryFilter::Only));
        let mut in_place = admin.lock().clone();
        let mut fresh = CatalogIndex::with_snapshot(admin.service().list_catalog().await.unwrap(), 12, 12);
        for filter in filters {
            in_place.select_category(filter);
            fresh.select_category(filter);
            let visible = in_place.compute_visible();
            assert_eq!(visible, fresh.compute_visible(), "filter {}", filter);
            assert!(visible.iter().all(|asset| !deleted.contains(&asset.id)), "filter {}", filter);

            let expected: Vec<&str> = ingested
                .iter()
                .filter(|asset| !deleted.contains(&asset.id) && filter.matches(asset.category))
                .map(|asset| asset.id.as_str())
                .collect();
            let ids: Vec<&str> = visible.iter().map(|asset| asset.id.as_str()).collect();
            assert_eq!(ids, expected, "filter {}", filter);
        }
    }

    #[tokio::test]
    async fn test_refresh_picks_up_external_writes() {
        let (admin, _blobs, _metadata) = controller().await;
        admin.service().ingest(b"img", Category::Street, None).await.unwrap();
        assert!(admin.list().is_empty());

        assert_eq!(admin.refresh().await.unwrap(), 1);
        assert_eq!(admin.list().len(), 1);
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = DeleteOutcome::from_result(&Ok(()));
        assert_eq!(serde_json::to_value(&outcome).unwrap(), serde_json::json!({"success": true}));
    }
}
