use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// A file that has been written to the serving root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// The generated name of the file, unique within the serving root.
    pub filename: String,

    /// The number of bytes actually written.
    pub size: u64,
}

#[async_trait]
pub trait StorageBackend: Sync + Send + 'static {
    /// Validates and persists a new image under a freshly generated name.
    ///
    /// `original_name` is only used to pick a file extension.
    async fn store(
        &self,
        data: Bytes,
        mimetype: &str,
        original_name: Option<&str>,
    ) -> Result<StoredFile, StorageError>;

    /// Removes a stored file, removing a file which does not exist is not an error.
    async fn remove(&self, filename: &str) -> Result<(), StorageError>;

    /// The path clients can fetch the given file from.
    fn public_url(&self, filename: &str) -> String;
}
