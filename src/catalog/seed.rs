//! Static, pre-seeded catalog source
//!
//! Reads one JSON array per category from `{dir}/{Category}.json`, e.g.
//! `Food.json`, with entries shaped `{"id": 1, "url": "https://..."}`. An
//! optional `createdAt` is honored. Files are read in category enumeration
//! order and concatenated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::catalog::CatalogSource;
use crate::error::CatalogError;
use crate::model::{Category, MediaAsset};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedId {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedEntry {
    id: SeedId,
    #[serde(alias = "blobRef", alias = "imageUrl")]
    url: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Catalog source backed by a directory of per-category JSON files
#[derive(Debug, Clone)]
pub struct SeedDirectory {
    dir: PathBuf,
}

impl SeedDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.json", category.label()))
    }

    async fn load_category(&self, category: Category) -> Result<Vec<MediaAsset>, CatalogError> {
        let path = self.file_for(category);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No seed file for {} at {}", category, path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(seed_error(&path, e)),
        };

        let entries: Vec<SeedEntry> = serde_json::from_str(&content).map_err(|e| seed_error(&path, e))?;
        Ok(entries
            .into_iter()
            .map(|entry| MediaAsset {
                id: seed_asset_id(category, &entry.id),
                category,
                blob_ref: entry.url,
                created_at: entry.created_at.unwrap_or_default(),
            })
            .collect())
    }
}

fn seed_error(path: &Path, e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Seed(format!("{}: {}", path.display(), e))
}

// Seed files number their entries per category, so ids are qualified with
// the category to stay unique across the whole catalog.
fn seed_asset_id(category: Category, id: &SeedId) -> String {
    match id {
        SeedId::Text(text) => format!("{}:{}", category.label(), text),
        SeedId::Number(number) => format!("{}:{}", category.label(), number),
    }
}

// Seed files may repeat an id. Later repeats get a `-2`, `-3`, ... suffix
// so every record in the snapshot has a distinct id.
fn disambiguate_ids(records: &mut [MediaAsset]) {
    let mut seen = HashSet::new();
    for record in records.iter_mut() {
        if seen.insert(record.id.clone()) {
            continue;
        }
        let mut occurrence = 2;
        let unique = loop {
            let candidate = format!("{}-{}", record.id, occurrence);
            if seen.insert(candidate.clone()) {
                break candidate;
            }
            occurrence += 1;
        };
        warn!("Duplicate seed id {}, using {}", record.id, unique);
        record.id = unique;
    }
}

#[async_trait]
impl CatalogSource for SeedDirectory {
    async fn load_snapshot(&self) -> Result<Vec<MediaAsset>, CatalogError> {
        let mut records = Vec::new();
        for category in Category::ALL {
            records.extend(self.load_category(category).await?);
        }
        disambiguate_ids(&mut records);
        info!("Loaded {} seeded records from {}", records.len(), self.dir.display());
        Ok(records)
    }
}
