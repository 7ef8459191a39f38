//! `FileSystemAccess` over `tokio::fs`

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Direct access to the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn host_error(e: std::io::Error) -> BridgeError {
    match e.kind() {
        ErrorKind::PermissionDenied => BridgeError::PermissionDenied(e.to_string()),
        _ => BridgeError::Io(e),
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(host_error)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(host_error)
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        fs::read(path).await.map(Bytes::from).map_err(host_error)
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(host_error)?;
        }
        fs::write(path, &data).await.map_err(host_error)?;
        debug!(path = %path.display(), size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(host_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents_and_reads_back() {
        let root = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let cover = root.path().join("artwork").join("ab").join("cover.jpg");

        fs.write_file(&cover, Bytes::from_static(b"jpeg-bytes"))
            .await
            .unwrap();

        assert!(fs.exists(&cover).await.unwrap());
        assert_eq!(fs.read_file(&cover).await.unwrap(), Bytes::from_static(b"jpeg-bytes"));
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_an_error() {
        let root = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = root.path().join("gone.jpg");

        fs.write_file(&path, Bytes::from_static(b"x")).await.unwrap();
        fs.delete_file(&path).await.unwrap();
        fs.delete_file(&path).await.unwrap();
        assert!(!fs.exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let root = TempDir::new().unwrap();
        let err = TokioFileSystem::new()
            .read_file(&root.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Io(ref e) if e.kind() == ErrorKind::NotFound));
    }
}
