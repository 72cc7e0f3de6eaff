use std::sync::Arc;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::error::{CreateError, DeleteError};
use crate::record::{Catalog, ImageRecord, Origin};
use crate::StorageBackend;

/// A new image to add to the catalog.
pub struct NewImage {
    pub data: Bytes,
    pub mimetype: String,
    pub source: Option<Origin>,
    pub original_name: Option<String>,
}

#[derive(Debug)]
pub struct DeleteOutcome {
    pub removed_record: ImageRecord,

    /// The number of records left in the catalog after the removal.
    pub remaining_count: usize,

    /// Set if the record was removed but its backing file could not be.
    pub file_removal_warning: Option<String>,
}

/// Keeps the catalog and the files in the serving root in step.
///
/// Each operation reads the catalog fresh from its store and mutating
/// operations write the whole catalog back. Nothing is locked between the
/// load and the save, so concurrent creates or deletes can drop each
/// other's change.
pub struct CatalogService {
    records: Arc<dyn CatalogStore>,
    storage: Arc<dyn StorageBackend>,
}

impl CatalogService {
    pub fn new(records: Arc<dyn CatalogStore>, storage: Arc<dyn StorageBackend>) -> Self {
        Self { records, storage }
    }

    pub async fn list_all(&self) -> Catalog {
        self.records.load().await
    }

    pub async fn get_by_id(&self, id: &str) -> Option<ImageRecord> {
        self.records
            .load()
            .await
            .into_iter()
            .find(|record| record.id == id)
    }

    pub async fn create(&self, image: NewImage) -> Result<ImageRecord, CreateError> {
        let stored = self
            .storage
            .store(image.data, &image.mimetype, image.original_name.as_deref())
            .await?;

        let record = ImageRecord {
            id: Uuid::new_v4().to_string(),
            url: self.storage.public_url(&stored.filename),
            source: image.source.unwrap_or_default(),
            uploaded_at: Utc::now(),
            filename: Some(stored.filename.clone()),
            original_name: image.original_name,
            size: Some(stored.size),
            mimetype: Some(image.mimetype),
            extra: Default::default(),
        };

        let mut catalog = self.records.load().await;
        catalog.push(record.clone());

        if let Err(e) = self.records.save(&catalog).await {
            error!(
                "Image {} was stored but the catalog could not be saved, the file is orphaned: {}",
                &stored.filename,
                e,
            );
            return Err(CreateError::PersistFailed {
                filename: stored.filename,
                source: e,
            });
        }

        info!("Image uploaded: {} ({}, {} bytes)", &stored.filename, &record.source, stored.size);
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome, DeleteError> {
        let mut catalog = self.records.load().await;

        let index = catalog
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| DeleteError::NotFound(id.to_string()))?;

        if catalog[index].source.is_protected() {
            return Err(DeleteError::Protected(id.to_string()));
        }

        let removed_record = catalog.remove(index);
        self.records.save(&catalog).await?;

        let file_removal_warning = match removed_record.backing_file() {
            None => None,
            Some(filename) => match self.storage.remove(filename).await {
                Ok(()) => {
                    debug!("Deleted file: {}", filename);
                    None
                },
                Err(e) => {
                    warn!("Error deleting file {} for image {}: {}", filename, id, e);
                    Some(format!("failed to delete file {}: {}", filename, e))
                },
            },
        };

        info!("Image deleted: {}", id);
        Ok(DeleteOutcome {
            removed_record,
            remaining_count: catalog.len(),
            file_removal_warning,
        })
    }
}
