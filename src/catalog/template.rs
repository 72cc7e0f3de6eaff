use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::Catalog;

/// A single document holding the whole catalog.
///
/// There is no partial update, every mutation loads the full catalog,
/// changes it in memory and saves it back. Two writers interleaving
/// their load and save will lose one of the updates.
#[async_trait]
pub trait CatalogStore: Sync + Send + 'static {
    /// Loads the persisted catalog.
    ///
    /// A missing or unreadable document is logged and treated as empty.
    async fn load(&self) -> Catalog;

    /// Replaces the persisted catalog with the given one.
    async fn save(&self, catalog: &Catalog) -> Result<(), StoreError>;
}
