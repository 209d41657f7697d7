//! Local filesystem blob storage implementation

use async_trait::async_trait;
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::blob::config::BlobStoreConfig;
use crate::blob::{validate_destination, BlobStore};
use crate::error::StoreError;
use crate::model::BlobRef;

fn map_io_error(e: io::Error, target: &str) -> StoreError {
    match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(format!("blob not found: {}", target)),
        io::ErrorKind::AlreadyExists => {
            StoreError::WriteRejected(format!("blob already exists: {}", target))
        }
        io::ErrorKind::PermissionDenied => {
            StoreError::PermissionDenied(format!("{}: {}", target, e))
        }
        _ => StoreError::StoreUnavailable(format!("{}: {}", target, e)),
    }
}

async fn write_contents(file: &mut fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

// Only called for a file this store just created
async fn discard_partial(file_path: &Path) {
    match fs::remove_file(file_path).await {
        Ok(()) => debug!("Removed partial blob {}", file_path.display()),
        Err(e) => warn!("Failed to remove partial blob {}: {}", file_path.display(), e),
    }
}

/// Blob store writing one file per object under a base directory.
///
/// URLs are `{public_base_url}/{destination_path}`.
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_base_url: String,
    max_blob_size: u64,
}

impl LocalBlobStore {
    pub fn new(config: &BlobStoreConfig) -> Self {
        info!(
            "Using local blob directory: {}, public url: {}",
            config.base_path, config.public_base_url
        );
        Self {
            base_path: PathBuf::from(&config.base_path),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_blob_size: config.max_blob_size,
        }
    }

    /// Resolve a URL issued by this store back to its file
    fn file_for(&self, blob_ref: &str) -> Result<PathBuf, StoreError> {
        let relative = blob_ref
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                StoreError::WriteRejected(format!("URL was not issued by this store: {}", blob_ref))
            })?;
        validate_destination(relative)?;
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store_blob(&self, data: &[u8], destination_path: &str) -> Result<BlobRef, StoreError> {
        validate_destination(destination_path)?;
        if data.is_empty() {
            return Err(StoreError::WriteRejected("empty blob".to_string()));
        }
        if data.len() as u64 > self.max_blob_size {
            return Err(StoreError::WriteRejected(format!(
                "blob of {} bytes exceeds limit of {} bytes",
                data.len(),
                self.max_blob_size
            )));
        }

        let file_path = self.base_path.join(destination_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io_error(e, destination_path))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await
            .map_err(|e| map_io_error(e, destination_path))?;
        if let Err(e) = write_contents(&mut file, data).await {
            drop(file);
            discard_partial(&file_path).await;
            return Err(map_io_error(e, destination_path));
        }

        info!("Wrote blob {} with size {}", destination_path, data.len());
        Ok(self.url_for(destination_path))
    }

    async fn delete_blob(&self, blob_ref: &str) -> Result<(), StoreError> {
        let file_path = self.file_for(blob_ref)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => {
                info!("Deleted blob {}", blob_ref);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete blob {}: {}", blob_ref, e);
                Err(map_io_error(e, blob_ref))
            }
        }
    }

    async fn read_blob(&self, blob_ref: &str) -> Result<Vec<u8>, StoreError> {
        let file_path = self.file_for(blob_ref)?;
        let data = fs::read(&file_path)
            .await
            .map_err(|e| map_io_error(e, blob_ref))?;
        debug!("Read blob {} with size {}", blob_ref, data.len());
        Ok(data)
    }

    fn url_for(&self, destination_path: &str) -> BlobRef {
        format!("{}/{}", self.public_base_url, destination_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::config::BlobBackend;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir, max_blob_size: u64) -> LocalBlobStore {
        LocalBlobStore::new(&BlobStoreConfig {
            backend: BlobBackend::Local,
            base_path: dir.path().to_string_lossy().to_string(),
            public_base_url: "http://localhost:9710/blobs/".to_string(),
            max_blob_size,
        })
    }

    #[tokio::test]
    async fn test_local_blob_store_basic_operations() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 1024);
        let data = b"jpeg bytes";

        let url = store.store_blob(data, "Food/1_abcd1234_dish.jpg").await.unwrap();
        assert_eq!(url, "http://localhost:9710/blobs/Food/1_abcd1234_dish.jpg");
        assert!(dir.path().join("Food/1_abcd1234_dish.jpg").exists());

        assert_eq!(store.read_blob(&url).await.unwrap(), data);

        store.delete_blob(&url).await.unwrap();
        assert!(!dir.path().join("Food/1_abcd1234_dish.jpg").exists());
    }

    #[tokio::test]
    async fn test_local_blob_store_error_cases() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, 4);

        // Empty and oversized payloads are refused
        assert!(matches!(
            store.store_blob(b"", "Food/a").await,
            Err(StoreError::WriteRejected(_))
        ));
        assert!(matches!(
            store.store_blob(b"12345", "Food/a").await,
            Err(StoreError::WriteRejected(_))
        ));

        // Path collisions are refused and leave the existing blob alone
        store.store_blob(b"1234", "Food/a").await.unwrap();
        assert!(matches!(
            store.store_blob(b"5678", "Food/a").await,
            Err(StoreError::WriteRejected(_))
        ));
        assert_eq!(std::fs::read(dir.path().join("Food/a")).unwrap(), b"1234");

        // Escaping the namespace is refused
        assert!(matches!(
            store.store_blob(b"1234", "../a").await,
            Err(StoreError::WriteRejected(_))
        ));

        // Deleting twice reports NotFound
        let url = "http://localhost:9710/blobs/Food/a";
        store.delete_blob(url).await.unwrap();
        assert!(matches!(store.delete_blob(url).await, Err(StoreError::NotFound(_))));

        // Foreign URLs are refused
        assert!(matches!(
            store.delete_blob("https://elsewhere.example/Food/a").await,
            Err(StoreError::WriteRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.jpg");
        std::fs::write(&path, b"half").unwrap();

        // A read-only handle makes the write itself fail
        let mut file = fs::File::open(&path).await.unwrap();
        assert!(write_contents(&mut file, b"more bytes").await.is_err());
        drop(file);

        discard_partial(&path).await;
        assert!(!path.exists());

        // Discarding a file that is already gone is only logged
        discard_partial(&path).await;
    }
}
