use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::StorageError;
use crate::storage::{validate_upload, StoredFile};
use crate::StorageBackend;

pub struct FileSystemBackend {
    directory: PathBuf,
    public_prefix: String,
}

impl FileSystemBackend {
    pub fn new(dir: PathBuf, public_prefix: String) -> Self {
        Self {
            directory: dir,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub async fn ensure_directory(&self) -> std::io::Result<()> {
        if !tokio::fs::try_exists(&self.directory).await? {
            tokio::fs::create_dir_all(&self.directory).await?;
            info!("Created uploads directory @ {:?}", &self.directory);
        }

        Ok(())
    }

    /// Resolves a stored filename to its path in the serving root.
    ///
    /// Only bare file names are accepted.
    fn format_path(&self, filename: &str) -> std::io::Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.directory.join(filename)),
            _ => Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("{:?} is not a valid image filename", filename),
            )),
        }
    }

    async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        Self::write_or_discard(path, file, data).await
    }

    /// Writes and flushes `data`, removing the file at `path` if either fails.
    async fn write_or_discard(
        path: &Path,
        mut file: impl AsyncWrite + Unpin,
        data: &[u8],
    ) -> std::io::Result<()> {
        let res = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = res {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(e);
        }

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileSystemBackend {
    async fn store(
        &self,
        data: Bytes,
        mimetype: &str,
        original_name: Option<&str>,
    ) -> Result<StoredFile, StorageError> {
        validate_upload(&data, mimetype)?;

        let filename = crate::utils::unique_filename(original_name, mimetype);
        let path = self.format_path(&filename)?;

        debug!("Storing image @ {:?}", &path);
        match Self::write_new(&path, &data).await {
            Ok(()) => {},
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&self.directory).await?;
                Self::write_new(&path, &data).await?;
            },
            Err(other) => return Err(other.into()),
        }

        Ok(StoredFile {
            filename,
            size: data.len() as u64,
        })
    }

    async fn remove(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.format_path(filename)?;

        debug!("Purging image @ {:?}", &path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::storage::MAX_IMAGE_SIZE;

    fn backend(dir: &Path) -> FileSystemBackend {
        FileSystemBackend::new(dir.to_path_buf(), "/uploads/".to_string())
    }

    #[tokio::test]
    async fn test_store_writes_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let backend = backend(tmp.path());

        let stored = backend
            .store(Bytes::from_static(b"\xff\xd8\xff\xe0jpeg"), "image/jpeg", Some("dog.jpg"))
            .await?;

        assert_eq!(stored.size, 8);
        assert!(stored.filename.ends_with(".jpg"));

        let on_disk = tokio::fs::read(tmp.path().join(&stored.filename)).await?;
        assert_eq!(on_disk, b"\xff\xd8\xff\xe0jpeg");

        Ok(())
    }

    #[tokio::test]
    async fn test_store_creates_missing_directory() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let backend = backend(&tmp.path().join("nested").join("uploads"));

        let stored = backend.store(Bytes::from_static(b"png"), "image/png", None).await?;
        assert!(tmp.path().join("nested/uploads").join(stored.filename).exists());

        Ok(())
    }

    #[tokio::test]
    async fn test_store_rejects_without_writing() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let backend = backend(tmp.path());

        let res = backend.store(Bytes::from_static(b"hello"), "text/plain", Some("a.txt")).await;
        assert!(matches!(
            res,
            Err(StorageError::Validation(ValidationError::NotAnImage { .. }))
        ));

        let res = backend
            .store(Bytes::from(vec![0u8; MAX_IMAGE_SIZE + 1]), "image/png", None)
            .await;
        assert!(matches!(
            res,
            Err(StorageError::Validation(ValidationError::TooLarge { .. }))
        ));

        assert_eq!(std::fs::read_dir(tmp.path())?.count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let backend = backend(tmp.path());

        let stored = backend.store(Bytes::from_static(b"gif"), "image/gif", None).await?;
        backend.remove(&stored.filename).await?;
        assert!(!tmp.path().join(&stored.filename).exists());

        backend.remove(&stored.filename).await?;
        backend.remove("never-existed.png").await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_refuses_paths() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let backend = backend(tmp.path());

        for name in ["../escape.jpg", "a/b.jpg", "/etc/passwd", ""] {
            assert!(backend.remove(name).await.is_err(), "{} should be refused", name);
        }

        Ok(())
    }

    struct FailingFlush(tokio::fs::File);

    impl AsyncWrite for FailingFlush {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::pin::Pin::new(&mut self.0).poll_write(cx, buf)
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(ErrorKind::Other, "disk full")))
        }

        fn poll_shutdown(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.0).poll_shutdown(cx)
        }
    }

    #[tokio::test]
    async fn test_failed_flush_removes_partial_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("123-abc.png");
        let file = tokio::fs::File::create(&path).await?;

        let res = FileSystemBackend::write_or_discard(&path, FailingFlush(file), b"png").await;
        assert!(res.is_err());
        assert!(!path.exists());

        Ok(())
    }

    #[test]
    fn test_public_url() {
        let backend = backend(Path::new("uploads"));
        assert_eq!(backend.public_url("123-abc.jpg"), "/uploads/123-abc.jpg");
    }
}
