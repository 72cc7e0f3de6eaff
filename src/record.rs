use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The full ordered set of image records.
pub type Catalog = Vec<ImageRecord>;

/// Where a catalogued image came from.
///
/// Persisted as a plain string so unknown tags written by other
/// clients survive a load/save cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Origin {
    /// Pre-seeded entries, these can never be deleted.
    Seed,
    Uploaded,
    RandomDog,
    Other(String),
}

impl Origin {
    #[inline]
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Seed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Seed => "seed",
            Self::Uploaded => "uploaded",
            Self::RandomDog => "random-dog",
            Self::Other(tag) => tag,
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::Uploaded
    }
}

impl From<String> for Origin {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "seed" => Self::Seed,
            "uploaded" => Self::Uploaded,
            "random-dog" => Self::RandomDog,
            _ => Self::Other(tag),
        }
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Other(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,

    /// The public path the image bytes can be fetched from.
    pub url: String,

    pub source: Origin,

    pub uploaded_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// The backing file under the serving root.
    ///
    /// Synthetic entries may not have one.
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,

    #[serde(flatten)]
    /// Keys written by other clients, carried through untouched.
    pub extra: Map<String, Value>,
}

impl ImageRecord {
    /// The backing filename, ignoring empty strings left by hand edited catalogs.
    pub fn backing_file(&self) -> Option<&str> {
        self.filename.as_deref().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
/// The on-disk layout of the catalog document.
///
/// Entries are kept as raw JSON so a single unreadable record
/// does not take the rest of the catalog down with it.
pub struct CatalogDocument {
    #[serde(default)]
    pub images: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_tags() {
        assert_eq!(Origin::from("seed".to_string()), Origin::Seed);
        assert_eq!(Origin::from("random-dog".to_string()), Origin::RandomDog);
        assert_eq!(
            Origin::from("cat-api".to_string()),
            Origin::Other("cat-api".to_string())
        );
        assert_eq!(String::from(Origin::Other("cat-api".into())), "cat-api");
        assert!(Origin::Seed.is_protected());
        assert!(!Origin::Uploaded.is_protected());
    }

    #[test]
    fn test_record_field_names() -> anyhow::Result<()> {
        let raw = r#"{
            "id": "1",
            "url": "/uploads/seed-dog1.jpg",
            "source": "seed",
            "uploadedAt": "2024-01-01T00:00:00.000Z",
            "filename": "seed-dog1.jpg"
        }"#;

        let record: ImageRecord = serde_json::from_str(raw)?;
        assert_eq!(record.source, Origin::Seed);
        assert_eq!(record.backing_file(), Some("seed-dog1.jpg"));
        assert!(record.size.is_none());

        let value = serde_json::to_value(&record)?;
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("uploadedAt"));
        assert!(!obj.contains_key("originalName"));
        assert_eq!(obj["source"], "seed");

        Ok(())
    }

    #[test]
    fn test_unknown_keys_survive() -> anyhow::Result<()> {
        let raw = r#"{
            "id": "7",
            "url": "/uploads/rex.jpg",
            "source": "uploaded",
            "uploadedAt": "2024-01-01T00:00:00Z",
            "title": "Rex",
            "tags": ["good", "boy"]
        }"#;

        let record: ImageRecord = serde_json::from_str(raw)?;
        assert_eq!(record.extra["title"], "Rex");

        let value = serde_json::to_value(&record)?;
        assert_eq!(value["title"], "Rex");
        assert_eq!(value["tags"][1], "boy");
        assert_eq!(value["id"], "7");

        Ok(())
    }

    #[test]
    fn test_empty_filename_has_no_backing_file() {
        let record = ImageRecord {
            id: "x".into(),
            url: "/uploads/".into(),
            source: Origin::Uploaded,
            uploaded_at: Utc::now(),
            filename: Some(String::new()),
            original_name: None,
            size: None,
            mimetype: None,
            extra: Map::new(),
        };
        assert!(record.backing_file().is_none());
    }
}
