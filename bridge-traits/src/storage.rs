//! File access used by the artwork cache and catalog bootstrap
//!
//! Paths are absolute. Hosts running in a sandbox map them onto whatever
//! storage they are allowed to touch.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create `path` and any missing parents. Existing directories are fine.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Replace the contents of `path`, creating parent directories first.
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    async fn delete_file(&self, path: &Path) -> Result<()>;
}
