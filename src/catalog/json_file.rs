use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::error::StoreError;
use crate::record::{Catalog, CatalogDocument, ImageRecord};

#[derive(Serialize)]
struct DocumentRef<'a> {
    images: &'a [Value],
}

/// A parsed catalog document.
struct Entries {
    records: Catalog,

    /// Entries that are not valid image records, kept verbatim.
    unreadable: Vec<Value>,
}

impl Entries {
    fn parse(data: &[u8]) -> serde_json::Result<Self> {
        let doc = serde_json::from_slice::<CatalogDocument>(data)?;

        let mut records = Catalog::with_capacity(doc.images.len());
        let mut unreadable = vec![];
        for entry in doc.images {
            match serde_json::from_value::<ImageRecord>(entry.clone()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping unreadable catalog entry {}: {}", entry, e);
                    unreadable.push(entry);
                },
            }
        }

        Ok(Self { records, unreadable })
    }
}

/// Keeps the catalog as a pretty printed JSON document on disk.
///
/// Entries which cannot be read as image records are hidden from `load`
/// but written back by `save`, after the readable records.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the given records as the initial catalog if no document exists yet.
    ///
    /// Returns if the catalog was seeded.
    pub async fn ensure_seeded(&self, records: Catalog) -> Result<bool, StoreError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }

        self.save(&records).await?;
        info!(
            "Created initial catalog @ {:?} with {} seed images",
            &self.path,
            records.len(),
        );

        Ok(true)
    }

    async fn read_entries(&self) -> Option<Entries> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                warn!("No catalog found @ {:?}, treating it as empty", &self.path);
                return None;
            },
            Err(e) => {
                error!("Error reading images data @ {:?}: {}", &self.path, e);
                return None;
            },
        };

        match Entries::parse(&data) {
            Ok(entries) => Some(entries),
            Err(e) => {
                error!("Catalog @ {:?} is corrupt, treating it as empty: {}", &self.path, e);
                None
            },
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog".to_string());

        self.path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
    }

    async fn write_temp(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl CatalogStore for JsonFileStore {
    async fn load(&self) -> Catalog {
        self.read_entries()
            .await
            .map(|entries| entries.records)
            .unwrap_or_default()
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let mut images = catalog
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<Value>>>()?;

        if let Some(entries) = self.read_entries().await {
            images.extend(entries.unreadable);
        }

        let data = serde_json::to_vec_pretty(&DocumentRef { images: &images })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.temp_path();
        debug!("Writing catalog of {} images @ {:?}", catalog.len(), &self.path);

        let res = match Self::write_temp(&tmp, &data).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = res {
            let _ = tokio::fs::remove_file(&tmp).await;
            error!("Error writing images data @ {:?}: {}", &self.path, e);
            return Err(e.into());
        }

        Ok(())
    }
}
