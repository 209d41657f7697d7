//! Catalog data model
//!
//! A `MediaAsset` is the catalog's unit of record. Categories are a fixed,
//! ordered enumeration; `CategoryFilter::All` is a synthetic wildcard that is
//! never stored on a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CatalogError;

/// Asset identifier type
pub type AssetId = String;

/// Blob locator type (a URL issued by the blob store)
pub type BlobRef = String;

/// Label of the synthetic wildcard filter
pub const ALL_LABEL: &str = "All";

/// The fixed set of gallery categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Wedding,
    PreWedding,
    Events,
    Street,
    Portraits,
    Food,
}

impl Category {
    /// Every category in enumeration order
    pub const ALL: [Category; 6] = [
        Category::Wedding,
        Category::PreWedding,
        Category::Events,
        Category::Street,
        Category::Portraits,
        Category::Food,
    ];

    /// Display label, also used as the blob path namespace
    pub fn label(&self) -> &'static str {
        match self {
            Category::Wedding => "Wedding",
            Category::PreWedding => "Pre-Wedding",
            Category::Events => "Events",
            Category::Street => "Street",
            Category::Portraits => "Portraits",
            Category::Food => "Food",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// Category filter applied by the catalog index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Whether a record of `category` passes this filter
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => *selected == category,
        }
    }

    /// Ordered filter labels offered to a display surface, wildcard first
    pub fn labels() -> Vec<&'static str> {
        std::iter::once(ALL_LABEL)
            .chain(Category::ALL.iter().map(Category::label))
            .collect()
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL_LABEL),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_LABEL) {
            Ok(CategoryFilter::All)
        } else {
            s.parse::<Category>().map(CategoryFilter::Only)
        }
    }
}

/// A catalog record. Fields are write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub id: AssetId,
    pub category: Category,
    pub blob_ref: BlobRef,
    pub created_at: DateTime<Utc>,
}

impl MediaAsset {
    /// Mint a new record with a fresh id and the current time
    pub fn new(category: Category, blob_ref: BlobRef) -> Self {
        Self {
            id: new_asset_id(),
            category,
            blob_ref,
            created_at: Utc::now(),
        }
    }
}

/// Fresh, catalog-wide unique asset id
pub fn new_asset_id() -> AssetId {
    Uuid::new_v4().to_string()
}

/// Build the blob destination path for an upload.
///
/// Layout is `{Category}/{unix_millis}_{digest8}_{id8}_{name}`. The category
/// namespaces the object; timestamp, content digest and asset id keep
/// concurrent uploads of the same file apart.
pub fn blob_path(
    category: Category,
    asset_id: &str,
    at: DateTime<Utc>,
    data: &[u8],
    file_name: Option<&str>,
) -> String {
    let digest = hex::encode(md5::compute(data).0);
    let tag: String = asset_id.chars().filter(char::is_ascii_alphanumeric).take(8).collect();
    let name = file_name
        .map(sanitize_file_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "image".to_string());
    format!("{}/{}_{}_{}_{}", category.label(), at.timestamp_millis(), &digest[..8], tag, name)
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_category_from_str() {
        assert_eq!("Food".parse::<Category>().unwrap(), Category::Food);
        assert_eq!("pre-wedding".parse::<Category>().unwrap(), Category::PreWedding);
        assert_eq!(" STREET ".parse::<Category>().unwrap(), Category::Street);
        assert!("Landscape".parse::<Category>().is_err());
        assert!("All".parse::<Category>().is_err());
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!("All".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Events".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Events)
        );
        assert!("Nature".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_filter_labels_wildcard_first() {
        let labels = CategoryFilter::labels();
        assert_eq!(labels.len(), 7);
        assert_eq!(labels[0], "All");
        assert_eq!(labels[2], "Pre-Wedding");
        assert_eq!(labels[6], "Food");
    }

    #[test]
    fn test_media_asset_json_shape() {
        let asset = MediaAsset {
            id: "a1".to_string(),
            category: Category::PreWedding,
            blob_ref: "mock://Pre-Wedding/1.jpg".to_string(),
            created_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["category"], "Pre-Wedding");
        assert_eq!(json["blobRef"], "mock://Pre-Wedding/1.jpg");
        assert!(json.get("createdAt").is_some());

        let back: MediaAsset = serde_json::from_value(json).unwrap();
        assert_eq!(back, asset);
    }

    #[test]
    fn test_new_asset_ids_are_unique() {
        let a = MediaAsset::new(Category::Food, "u1".to_string());
        let b = MediaAsset::new(Category::Food, "u1".to_string());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_blob_path_layout() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let path = blob_path(Category::Events, "0f1e2d3c-4b5a", at, b"hello", Some("../../etc/pass wd.jpg"));
        assert!(path.starts_with("Events/1700000000123_5d41402a_0f1e2d3c_"));
        assert!(path.ends_with("_passwd.jpg"));

        let unnamed = blob_path(Category::Food, "a1", at, b"hello", None);
        assert!(unnamed.ends_with("_a1_image"));

        let other = blob_path(Category::Food, "a1", at, b"world", None);
        assert_ne!(unnamed, other);

        let same_bytes = blob_path(Category::Food, "b2", at, b"hello", None);
        assert_ne!(unnamed, same_bytes);
    }
}
