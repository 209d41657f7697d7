//! Public gallery session

use serde::Serialize;

use crate::catalog::{CatalogIndex, CatalogSource};
use crate::error::CatalogError;
use crate::model::{CategoryFilter, MediaAsset};

/// What a gallery surface renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryView {
    /// Label of the active filter
    pub category: String,
    pub visible_assets: Vec<MediaAsset>,
    pub has_more: bool,
    pub is_loading: bool,
    /// Records matching the filter, visible or not
    pub total: usize,
}

/// One viewer's gallery: an index over a snapshot plus the loading flag
#[derive(Debug, Clone)]
pub struct GallerySession {
    index: CatalogIndex,
    is_loading: bool,
}

impl GallerySession {
    pub fn new(index: CatalogIndex) -> Self {
        Self { index, is_loading: false }
    }

    /// Materialize a session from a snapshot of `source`
    pub async fn open(source: &dyn CatalogSource, page_size: usize) -> Result<Self, CatalogError> {
        let snapshot = source.load_snapshot().await?;
        Ok(Self::new(CatalogIndex::with_snapshot(snapshot, page_size, page_size)))
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn category_selected(&mut self, filter: CategoryFilter) -> GalleryView {
        self.index.select_category(filter);
        self.render()
    }

    pub fn load_more_requested(&mut self) -> GalleryView {
        self.index.load_more();
        self.render()
    }

    /// Mark a refresh in flight. The current records stay visible meanwhile.
    pub fn begin_refresh(&mut self) {
        self.is_loading = true;
    }

    /// Apply the outcome of a refresh. A failed refresh keeps the old
    /// snapshot.
    pub fn finish_refresh(&mut self, snapshot: Option<Vec<MediaAsset>>) -> GalleryView {
        if let Some(records) = snapshot {
            self.index.replace_snapshot(records);
        }
        self.is_loading = false;
        self.render()
    }

    pub fn render(&self) -> GalleryView {
        GalleryView {
            category: self.index.filter().to_string(),
            visible_assets: self.index.compute_visible(),
            has_more: self.index.has_more(),
            is_loading: self.is_loading,
            total: self.index.total_for_filter(),
        }
    }
}
