//! Mock implementation of MetadataStore for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::metadata::MetadataStore;
use crate::model::MediaAsset;

#[derive(Default)]
struct MockMetadataState {
    // Insertion order is kept so that ties on created_at list stably
    records: Vec<MediaAsset>,
    put_failure: Option<StoreError>,
    // Error returned after the put has been applied, like a remote timeout
    put_ack_failure: Option<StoreError>,
    delete_failure: Option<StoreError>,
    list_failure: Option<StoreError>,
}

/// Mock implementation of MetadataStore for testing
#[derive(Clone, Default)]
pub struct MockMetadataStore {
    state: Arc<Mutex<MockMetadataState>>,
}

impl MockMetadataStore {
    /// Create a new mock metadata store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockMetadataState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every following put fail with `error` (None clears it)
    pub fn fail_puts_with(&self, error: Option<StoreError>) {
        self.lock().put_failure = error;
    }

    /// Apply every following put, then report `error` anyway (None clears it)
    pub fn fail_put_acks_with(&self, error: Option<StoreError>) {
        self.lock().put_ack_failure = error;
    }

    /// Make every following delete fail with `error` (None clears it)
    pub fn fail_deletes_with(&self, error: Option<StoreError>) {
        self.lock().delete_failure = error;
    }

    /// Make every following listing fail with `error` (None clears it)
    pub fn fail_lists_with(&self, error: Option<StoreError>) {
        self.lock().list_failure = error;
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().records.iter().any(|record| record.id == id)
    }

    /// Clear all data from the store (useful for test cleanup)
    pub fn clear(&self) {
        self.lock().records.clear();
    }
}

#[async_trait]
impl MetadataStore for MockMetadataStore {
    async fn put_record(&self, record: &MediaAsset) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(error) = state.put_failure.clone() {
            return Err(error);
        }
        if state.records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::WriteRejected(format!("record {} already exists", record.id)));
        }
        state.records.push(record.clone());
        match state.put_ack_failure.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn get_record(&self, id: &str) -> Result<MediaAsset, StoreError> {
        self.lock()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("no record with id {}", id)))
    }

    async fn delete_record(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(error) = state.delete_failure.clone() {
            return Err(error);
        }
        let position = state
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("no record with id {}", id)))?;
        state.records.remove(position);
        Ok(())
    }

    async fn list_all_records(&self) -> Result<Vec<MediaAsset>, StoreError> {
        let state = self.lock();
        if let Some(error) = state.list_failure.clone() {
            return Err(error);
        }
        let mut records = state.records.clone();
        // Stable: equal timestamps keep insertion order
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use chrono::{TimeZone, Utc};

    fn asset(id: &str, millis: i64) -> MediaAsset {
        MediaAsset {
            id: id.to_string(),
            category: Category::Food,
            blob_ref: format!("mock://Food/{}", id),
            created_at: Utc.timestamp_millis_opt(millis).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_mock_metadata_store_basic_operations() {
        let store = MockMetadataStore::new();
        assert_eq!(store.record_count(), 0);

        store.put_record(&asset("a1", 1)).await.unwrap();
        assert_eq!(store.record_count(), 1);
        assert!(store.contains("a1"));

        // Duplicate ids are rejected
        assert!(matches!(
            store.put_record(&asset("a1", 2)).await,
            Err(StoreError::WriteRejected(_))
        ));

        assert_eq!(store.get_record("a1").await.unwrap().blob_ref, "mock://Food/a1");

        store.delete_record("a1").await.unwrap();
        assert!(!store.contains("a1"));
        assert!(matches!(store.delete_record("a1").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.get_record("a1").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mock_metadata_store_listing_order() {
        let store = MockMetadataStore::new();
        store.put_record(&asset("b", 20)).await.unwrap();
        store.put_record(&asset("a", 10)).await.unwrap();
        store.put_record(&asset("c", 20)).await.unwrap();

        let ids: Vec<String> = store
            .list_all_records()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_metadata_store_error_cases() {
        let store = MockMetadataStore::new();

        store.fail_puts_with(Some(StoreError::PermissionDenied("read only".to_string())));
        assert!(matches!(
            store.put_record(&asset("a1", 1)).await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert_eq!(store.record_count(), 0);
        store.fail_puts_with(None);

        store.put_record(&asset("a1", 1)).await.unwrap();
        store.fail_deletes_with(Some(StoreError::StoreUnavailable("offline".to_string())));
        assert!(store.delete_record("a1").await.is_err());
        assert!(store.contains("a1"));

        store.fail_put_acks_with(Some(StoreError::StoreUnavailable("timeout".to_string())));
        assert!(store.put_record(&asset("a2", 2)).await.is_err());
        assert!(store.contains("a2"));
        store.fail_put_acks_with(None);
        store.fail_deletes_with(None);
        store.delete_record("a2").await.unwrap();

        store.fail_lists_with(Some(StoreError::StoreUnavailable("offline".to_string())));
        assert!(store.list_all_records().await.is_err());
        store.fail_lists_with(None);
        assert_eq!(store.list_all_records().await.unwrap().len(), 1);

        store.clear();
        assert_eq!(store.record_count(), 0);
    }
}
