//! Mock implementation of BlobStore for testing
//!
//! Keeps blobs in memory and lets tests force failures on writes or deletes.

use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::blob::{validate_destination, BlobStore};
use crate::error::StoreError;
use crate::model::BlobRef;

const MOCK_SCHEME: &str = "mock://";

#[derive(Default)]
struct MockBlobState {
    // url -> bytes
    blobs: HashMap<String, Vec<u8>>,
    write_failure: Option<StoreError>,
    delete_failure: Option<StoreError>,
}

/// Mock implementation of BlobStore for testing
#[derive(Clone, Default)]
pub struct MockBlobStore {
    state: Arc<Mutex<MockBlobState>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockBlobState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every following write fail with `error` (None clears it)
    pub fn fail_writes_with(&self, error: Option<StoreError>) {
        self.lock().write_failure = error;
    }

    /// Make every following delete fail with `error` (None clears it)
    pub fn fail_deletes_with(&self, error: Option<StoreError>) {
        self.lock().delete_failure = error;
    }

    pub fn blob_count(&self) -> usize {
        self.lock().blobs.len()
    }

    pub fn contains(&self, blob_ref: &str) -> bool {
        self.lock().blobs.contains_key(blob_ref)
    }

    /// URLs of every stored blob
    pub fn urls(&self) -> Vec<BlobRef> {
        let mut urls: Vec<BlobRef> = self.lock().blobs.keys().cloned().collect();
        urls.sort();
        urls
    }

    pub fn clear(&self) {
        self.lock().blobs.clear();
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn store_blob(&self, data: &[u8], destination_path: &str) -> Result<BlobRef, StoreError> {
        validate_destination(destination_path)?;
        let mut state = self.lock();
        if let Some(error) = state.write_failure.clone() {
            return Err(error);
        }
        if data.is_empty() {
            return Err(StoreError::WriteRejected("empty blob".to_string()));
        }

        let url = self.url_for(destination_path);
        if state.blobs.contains_key(&url) {
            return Err(StoreError::WriteRejected(format!("blob already exists: {}", destination_path)));
        }
        state.blobs.insert(url.clone(), data.to_vec());
        info!("Mock: Wrote blob {} with size {}", url, data.len());
        Ok(url)
    }

    async fn delete_blob(&self, blob_ref: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(error) = state.delete_failure.clone() {
            return Err(error);
        }
        match state.blobs.remove(blob_ref) {
            Some(_) => {
                info!("Mock: Deleted blob {}", blob_ref);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("blob not found: {}", blob_ref))),
        }
    }

    async fn read_blob(&self, blob_ref: &str) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .blobs
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("blob not found: {}", blob_ref)))
    }

    fn url_for(&self, destination_path: &str) -> BlobRef {
        format!("{}{}", MOCK_SCHEME, destination_path)
    }
}
