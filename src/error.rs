use thiserror::Error;

/// The upload was rejected before anything touched the disk.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Only image files are allowed, got content type {mimetype:?}")]
    NotAnImage { mimetype: String },

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Image storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure writing the catalog document.
///
/// Reads never produce this, a missing or unreadable catalog is
/// treated as empty.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error(transparent)]
    Validation(ValidationError),

    #[error(transparent)]
    Storage(std::io::Error),

    /// The image file was written but the catalog could not be saved,
    /// `filename` is left on disk without a record pointing at it.
    #[error("Failed to save image data, {filename} was stored but is not catalogued: {source}")]
    PersistFailed {
        filename: String,
        #[source]
        source: StoreError,
    },
}

impl From<StorageError> for CreateError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Validation(e) => Self::Validation(e),
            StorageError::Io(e) => Self::Storage(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Cannot delete seed image: {0}")]
    Protected(String),

    #[error("Failed to update images data: {0}")]
    PersistFailed(#[from] StoreError),
}
