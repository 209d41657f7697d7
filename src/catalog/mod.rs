//! Catalog materialization: the per-session index and the sources it is
//! loaded from.

pub mod index;
pub mod seed;

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::model::MediaAsset;

pub use index::CatalogIndex;
pub use seed::SeedDirectory;

/// Something a session can materialize a catalog snapshot from
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Full snapshot in listing order
    async fn load_snapshot(&self) -> Result<Vec<MediaAsset>, CatalogError>;
}
