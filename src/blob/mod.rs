//! Blob Storage Layer Abstraction
//!
//! This module provides an abstraction over the binary object store that
//! holds image bytes. A backend writes bytes under a destination path and
//! issues a dereferenceable URL for them; the URL is the only handle the rest
//! of the system keeps.

pub mod config;
pub mod local_store;
pub mod mock_store;

use async_trait::async_trait;
use std::path::{Component, Path};

use crate::error::StoreError;
use crate::model::BlobRef;

/// Trait defining the blob storage interface
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `destination_path` and return the URL issued for it.
    ///
    /// Fails with `StoreUnavailable` or `WriteRejected`.
    async fn store_blob(&self, data: &[u8], destination_path: &str) -> Result<BlobRef, StoreError>;

    /// Delete the blob behind a URL previously issued by this store.
    ///
    /// Fails with `NotFound` when the blob is already gone, or `StoreUnavailable`.
    async fn delete_blob(&self, blob_ref: &str) -> Result<(), StoreError>;

    /// Read the bytes behind a URL issued by this store
    async fn read_blob(&self, blob_ref: &str) -> Result<Vec<u8>, StoreError>;

    /// The URL this store issues for `destination_path`
    fn url_for(&self, destination_path: &str) -> BlobRef;
}

/// Reject destination paths that are empty, absolute, or climb out of the
/// store's namespace.
pub(crate) fn validate_destination(destination_path: &str) -> Result<(), StoreError> {
    if destination_path.is_empty() {
        return Err(StoreError::WriteRejected("empty destination path".to_string()));
    }
    let path = Path::new(destination_path);
    let all_normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !all_normal {
        return Err(StoreError::WriteRejected(format!(
            "destination path escapes the store namespace: {}",
            destination_path
        )));
    }
    Ok(())
}
