use std::path::{Path, PathBuf};
use chrono::Utc;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::record::{Catalog, ImageRecord, Origin};
use crate::storage::backends::BackendConfigs;
use crate::StorageBackend;

static CONFIG: OnceCell<RuntimeConfig> = OnceCell::new();

pub fn config() -> &'static RuntimeConfig {
    CONFIG.get().expect("config init")
}

/// Loads the runtime config from the given YAML file, or the defaults
/// if no file is given.
pub async fn init(config_file: Option<&Path>) -> anyhow::Result<()> {
    let cfg = match config_file {
        Some(file) => {
            let file = tokio::fs::read(file).await?;
            serde_yaml::from_slice::<RuntimeConfig>(&file)?
        },
        None => RuntimeConfig::default(),
    };

    let _ = CONFIG.set(cfg);

    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    /// The storage backend holding image files.
    pub backend: BackendConfigs,

    #[serde(default)]
    /// Where the catalog document lives and what it starts with.
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    /// The path of the JSON catalog document.
    ///
    /// Defaults to `data/images.json`.
    pub path: PathBuf,

    #[serde(default = "default_seed")]
    /// The protected images written to a brand new catalog.
    ///
    /// Only used when no catalog document exists on startup.
    pub seed: Vec<SeedImage>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            seed: default_seed(),
        }
    }
}

impl CatalogConfig {
    pub fn seed_records(&self, storage: &dyn StorageBackend) -> Catalog {
        let now = Utc::now();
        self.seed
            .iter()
            .map(|seed| ImageRecord {
                id: seed.id.clone(),
                url: seed
                    .url
                    .clone()
                    .unwrap_or_else(|| storage.public_url(&seed.filename)),
                source: Origin::Seed,
                uploaded_at: now,
                filename: Some(seed.filename.clone()),
                original_name: None,
                size: None,
                mimetype: None,
                extra: Default::default(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedImage {
    pub id: String,

    /// The file in the serving root backing this image.
    pub filename: String,

    #[serde(default)]
    /// Overrides the generated public url.
    pub url: Option<String>,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/images.json")
}

fn default_seed() -> Vec<SeedImage> {
    (1..=3)
        .map(|i| SeedImage {
            id: i.to_string(),
            filename: format!("seed-dog{}.jpg", i),
            url: None,
        })
        .collect()
}
