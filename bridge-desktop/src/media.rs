//! Directory-backed media asset provider
//!
//! Walks the configured library folders with `walkdir` and reports every file
//! whose extension is on the audio allow-list. The walk happens once per
//! enumeration (when the cursor is `None`); later pages are served from that
//! snapshot so paging never observes a half-changed tree.
//!
//! A configured root that does not exist fails the enumeration. An unmounted
//! drive must not look like an empty library, or the next scan would
//! soft-delete every track under it.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::media::{AssetDescriptor, AssetPage, MediaAssetProvider, PermissionStatus};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use walkdir::WalkDir;

fn unix_seconds(time: std::io::Result<SystemTime>) -> Option<i64> {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "aac", "ogg", "opus", "wav"];

/// Desktop [`MediaAssetProvider`] over a set of library folders.
///
/// The asset id and uri are the absolute file path. Duration is reported as
/// `0.0`; the tag reader fills it in.
pub struct DirectoryMediaProvider {
    roots: Vec<PathBuf>,
    extensions: HashSet<String>,
    snapshot: Mutex<Option<Arc<Vec<AssetDescriptor>>>>,
}

impl DirectoryMediaProvider {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            snapshot: Mutex::new(None),
        }
    }

    /// Replace the extension allow-list (case-insensitive, no leading dot).
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn walk(roots: &[PathBuf], extensions: &HashSet<String>) -> Result<Vec<AssetDescriptor>> {
        let mut assets = Vec::new();

        for root in roots {
            if !root.is_dir() {
                warn!(root = ?root, "Library root is missing");
                return Err(missing_root(root));
            }

            for entry in WalkDir::new(root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                if !entry.file_type().is_file() || !has_audio_extension(entry.path(), extensions)
                {
                    continue;
                }

                if let Some(asset) = describe(entry.path()) {
                    assets.push(asset);
                }
            }
        }

        assets.sort_by(|a, b| a.id.cmp(&b.id));
        assets.dedup_by(|a, b| a.id == b.id);
        Ok(assets)
    }

    async fn refresh_snapshot(&self) -> Result<Arc<Vec<AssetDescriptor>>> {
        let roots = self.roots.clone();
        let extensions = self.extensions.clone();

        let assets = tokio::task::spawn_blocking(move || Self::walk(&roots, &extensions))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Library walk failed: {}", e)))??;

        debug!(count = assets.len(), "Walked library roots");

        let assets = Arc::new(assets);
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|_| BridgeError::OperationFailed("Snapshot lock poisoned".to_string()))?;
        *snapshot = Some(Arc::clone(&assets));
        Ok(assets)
    }

    fn current_snapshot(&self) -> Result<Arc<Vec<AssetDescriptor>>> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|_| BridgeError::OperationFailed("Snapshot lock poisoned".to_string()))?;
        snapshot.clone().ok_or_else(|| {
            BridgeError::OperationFailed("Cursor given before the first page".to_string())
        })
    }
}

fn missing_root(root: &Path) -> BridgeError {
    BridgeError::OperationFailed(format!("Library root not found: {}", root.display()))
}

fn has_audio_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_ascii_lowercase()))
        .unwrap_or(false)
}

fn describe(path: &Path) -> Option<AssetDescriptor> {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let location = absolute.to_str()?.to_string();
    let filename = absolute.file_name()?.to_str()?.to_string();
    let metadata = std::fs::metadata(&absolute).ok()?;

    let modified = unix_seconds(metadata.modified()).unwrap_or_default();
    let created = unix_seconds(metadata.created()).unwrap_or(modified);

    Some(
        AssetDescriptor::new(location.clone(), location, filename)
            .with_modification_time(modified)
            .with_creation_time(created),
    )
}

#[async_trait]
impl MediaAssetProvider for DirectoryMediaProvider {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        for root in &self.roots {
            match std::fs::read_dir(root) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    warn!(root = ?root, "Library root is not readable");
                    return Ok(PermissionStatus::Denied);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(root = ?root, "Library root is missing");
                    return Err(missing_root(root));
                }
                Err(_) => {}
            }
        }
        Ok(PermissionStatus::Granted)
    }

    async fn list_assets(&self, cursor: Option<String>, page_size: usize) -> Result<AssetPage> {
        let page_size = page_size.max(1);

        let (assets, offset) = match cursor {
            None => (self.refresh_snapshot().await?, 0),
            Some(cursor) => {
                let offset = cursor.parse::<usize>().map_err(|_| {
                    BridgeError::OperationFailed(format!("Invalid page cursor: {}", cursor))
                })?;
                (self.current_snapshot()?, offset)
            }
        };

        let end = (offset + page_size).min(assets.len());
        let page: Vec<AssetDescriptor> = assets.get(offset..end).unwrap_or_default().to_vec();
        let next_cursor = (end < assets.len()).then(|| end.to_string());

        Ok(AssetPage::new(page, next_cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_lists_audio_files_recursively() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        File::create(root.join("song.mp3")).unwrap();
        File::create(root.join("music.flac")).unwrap();
        File::create(root.join("notes.txt")).unwrap();
        File::create(root.join("UPPERCASE.OGG")).unwrap();
        std::fs::create_dir(root.join("subdir")).unwrap();
        File::create(root.join("subdir").join("track.wav")).unwrap();
        File::create(root.join("subdir").join("cover.png")).unwrap();

        let provider = DirectoryMediaProvider::new(vec![root.to_path_buf()]);
        let page = provider.list_assets(None, 100).await.unwrap();

        assert!(page.next_cursor.is_none());
        let names: Vec<&str> = page.assets.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"UPPERCASE.OGG"));
        assert!(names.contains(&"track.wav"));
        assert!(!names.contains(&"notes.txt"));

        let song = page
            .assets
            .iter()
            .find(|a| a.filename == "song.mp3")
            .unwrap();
        assert_eq!(song.id, song.uri);
        assert!(Path::new(&song.id).is_absolute());
        assert!(song.modification_time > 0);
        assert_eq!(song.duration, 0.0);
    }

    #[tokio::test]
    async fn test_pages_follow_cursor() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            File::create(dir.path().join(format!("{:02}.mp3", i))).unwrap();
        }

        let provider = DirectoryMediaProvider::new(vec![dir.path().to_path_buf()]);
        let first = provider.list_assets(None, 2).await.unwrap();
        assert_eq!(first.assets.len(), 2);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let second = provider.list_assets(first.next_cursor, 2).await.unwrap();
        let third = provider.list_assets(second.next_cursor, 2).await.unwrap();
        assert_eq!(third.assets.len(), 1);
        assert!(third.next_cursor.is_none());
        assert_eq!(third.assets[0].filename, "04.mp3");
    }

    #[tokio::test]
    async fn test_custom_extensions() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.mp3")).unwrap();
        File::create(dir.path().join("b.dsf")).unwrap();

        let provider = DirectoryMediaProvider::new(vec![dir.path().to_path_buf()])
            .with_extensions(vec![".DSF".to_string()]);

        assert_eq!(
            provider.request_permission().await.unwrap(),
            PermissionStatus::Granted
        );
        let page = provider.list_assets(None, 10).await.unwrap();
        assert_eq!(page.assets.len(), 1);
        assert_eq!(page.assets[0].filename, "b.dsf");
    }

    #[tokio::test]
    async fn test_missing_root_fails_enumeration() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.mp3")).unwrap();

        let provider = DirectoryMediaProvider::new(vec![
            dir.path().to_path_buf(),
            dir.path().join("unmounted"),
        ]);

        let err = provider.list_assets(None, 10).await.unwrap_err();
        assert!(err.to_string().contains("unmounted"));
        assert!(provider.request_permission().await.is_err());
        // No snapshot was taken, so a cursor has nothing to page through
        assert!(provider.list_assets(Some("0".to_string()), 10).await.is_err());
    }

    #[tokio::test]
    async fn test_cursor_before_first_page_is_rejected() {
        let provider = DirectoryMediaProvider::new(vec![]);
        assert!(provider.list_assets(Some("10".to_string()), 10).await.is_err());
        assert!(provider.list_assets(None, 10).await.unwrap().assets.is_empty());
    }
}
