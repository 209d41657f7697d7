//! Metadata Storage Layer Abstraction
//!
//! This module provides an abstraction over the document store that holds
//! catalog records, allowing the system to use different implementations
//! (SQLite, remote document databases, in-memory) without affecting the
//! catalog service.

pub mod config;
pub mod mock_store;
pub mod sqlite_store;


use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::MediaAsset;

/// Trait defining the metadata storage interface
///
/// Every call may fail with `StoreUnavailable` or `PermissionDenied`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store a new record. A record with the same id is `WriteRejected`.
    async fn put_record(&self, record: &MediaAsset) -> Result<(), StoreError>;

    /// Retrieve one record, `NotFound` if absent
    async fn get_record(&self, id: &str) -> Result<MediaAsset, StoreError>;

    /// Delete one record, `NotFound` if absent
    async fn delete_record(&self, id: &str) -> Result<(), StoreError>;

    /// Scan the whole collection in creation order
    async fn list_all_records(&self) -> Result<Vec<MediaAsset>, StoreError>;
}
