use std::path::PathBuf;
use std::sync::Arc;
use serde::Deserialize;

use crate::StorageBackend;

pub mod filesystem;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendConfigs {
    FileSystem {
        /// The serving root images are written to.
        directory: PathBuf,

        #[serde(default = "default_public_prefix")]
        /// The path the serving root is mounted at.
        public_prefix: String,
    }
}

impl Default for BackendConfigs {
    fn default() -> Self {
        Self::FileSystem {
            directory: PathBuf::from("uploads"),
            public_prefix: default_public_prefix(),
        }
    }
}

impl BackendConfigs {
    pub async fn connect(&self) -> anyhow::Result<Arc<dyn StorageBackend>> {
        match self {
            Self::FileSystem { directory, public_prefix } => {
                let backend = filesystem::FileSystemBackend::new(
                    directory.clone(),
                    public_prefix.clone(),
                );
                backend.ensure_directory().await?;
                Ok(Arc::new(backend))
            }
        }
    }

    /// The directory served read-only to clients.
    pub fn serving_root(&self) -> &PathBuf {
        match self {
            Self::FileSystem { directory, .. } => directory,
        }
    }

    pub fn public_prefix(&self) -> &str {
        match self {
            Self::FileSystem { public_prefix, .. } => public_prefix,
        }
    }
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}
