//! Category-windowed catalog index
//!
//! An in-memory materialization of one catalog snapshot. The visible page is
//! always a prefix of the records matching the current filter, in snapshot
//! order; the wildcard filter uses the global snapshot order.

use crate::model::{AssetId, CategoryFilter, MediaAsset};

/// Default window size and load-more increment
pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone)]
pub struct CatalogIndex {
    records: Vec<MediaAsset>,
    filter: CategoryFilter,
    window: usize,
    initial_window: usize,
    increment: usize,
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE)
    }
}

impl CatalogIndex {
    /// Empty index. Zero sizes are raised to 1 so that paging always advances.
    pub fn new(initial_window: usize, increment: usize) -> Self {
        let initial_window = initial_window.max(1);
        Self {
            records: Vec::new(),
            filter: CategoryFilter::All,
            window: initial_window,
            initial_window,
            increment: increment.max(1),
        }
    }

    /// Index over `records`, kept in the order given
    pub fn with_snapshot(records: Vec<MediaAsset>, initial_window: usize, increment: usize) -> Self {
        let mut index = Self::new(initial_window, increment);
        index.records = records;
        index
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&MediaAsset> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Every record in snapshot order, ignoring filter and window
    pub fn records(&self) -> &[MediaAsset] {
        &self.records
    }

    /// Switch the filter and go back to the first page
    pub fn select_category(&mut self, filter: CategoryFilter) {
        self.filter = filter;
        self.window = self.initial_window;
    }

    fn matching(&self) -> impl Iterator<Item = &MediaAsset> {
        let filter = self.filter;
        self.records.iter().filter(move |record| filter.matches(record.category))
    }

    /// The first `window_size` records matching the filter
    pub fn compute_visible(&self) -> Vec<MediaAsset> {
        self.matching().take(self.window).cloned().collect()
    }

    pub fn total_for_filter(&self) -> usize {
        self.matching().count()
    }

    /// Whether `load_more` would reveal more records
    pub fn has_more(&self) -> bool {
        self.window < self.total_for_filter()
    }

    /// Grow the window by one increment; no-op once it covers every match.
    /// Returns whether the window changed.
    pub fn load_more(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.window += self.increment;
        true
    }

    /// Append a freshly ingested record. Returns false if the id is already
    /// present, leaving the index untouched.
    pub fn insert(&mut self, asset: MediaAsset) -> bool {
        if self.contains(&asset.id) {
            return false;
        }
        self.records.push(asset);
        true
    }

    /// Drop a deleted record, returning it if it was present
    pub fn remove(&mut self, id: &str) -> Option<MediaAsset> {
        let position = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(position))
    }

    /// Replace every record with a newer snapshot. Filter and window are kept.
    pub fn replace_snapshot(&mut self, records: Vec<MediaAsset>) {
        self.records = records;
    }

    /// Ids of the visible page, mostly useful for logging
    pub fn visible_ids(&self) -> Vec<AssetId> {
        self.matching().take(self.window).map(|record| record.id.clone()).collect()
    }
}
