//! Content-Addressed Artwork Cache
//!
//! Stores each distinct cover image once under `<artwork_dir>/<hash>.jpg`
//! and returns a stable path for it.
//!
//! ## Addressing
//!
//! The hash is FNV-1a 64 over the first 16 KiB of the image plus the total
//! byte length, rendered as `<16 hex>-<len hex>`. Two images sharing both
//! their first 16 KiB and their length are treated as identical.
//!
//! ## Lookup order
//!
//! 1. In-memory LRU memo of hash to path
//! 2. `artwork_cache` row
//! 3. Write the file and upsert the row
//!
//! A hit at steps 1 or 2 is only trusted while its file still exists.
//! Steps 2 and 3 run under a single writer lock, and the memo is checked
//! again once the lock is held, so concurrent stores of the same image
//! write its file once.

use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use bytes::Bytes;
use core_library::hashing::{fnv1a_64, to_hex};
use core_library::models::ArtworkCacheEntry;
use core_library::repositories::ArtworkCacheRepository;
use lru::LruCache;
use std::io::Cursor;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{MetadataError, Result};
use crate::reader::ArtworkData;

/// Bytes of each image that feed the content hash
pub const HASH_PREFIX_BYTES: usize = 16 * 1024;

/// Default number of memoized hash to path entries
pub const DEFAULT_MEMO_CAPACITY: usize = 256;

/// Content address of an image
pub fn artwork_hash(data: &[u8]) -> String {
    let prefix = &data[..data.len().min(HASH_PREFIX_BYTES)];
    format!("{}-{:x}", to_hex(fnv1a_64(prefix)), data.len())
}

/// Pixel dimensions when the image header can be decoded
fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Deduplicating artwork store
pub struct ArtworkCache {
    repository: Arc<dyn ArtworkCacheRepository>,
    file_system: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    artwork_dir: PathBuf,
    memo: Mutex<LruCache<String, String>>,
    /// Held from the repository lookup until the memo holds the new path
    writer: Mutex<()>,
}

impl ArtworkCache {
    /// Create a cache writing into `artwork_dir`
    pub fn new(
        repository: Arc<dyn ArtworkCacheRepository>,
        file_system: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
        artwork_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            file_system,
            clock,
            artwork_dir: artwork_dir.into(),
            memo: Mutex::new(LruCache::new(Self::capacity(DEFAULT_MEMO_CAPACITY))),
            writer: Mutex::new(()),
        }
    }

    /// Resize the in-memory memo; `0` is treated as `1`
    pub fn with_memo_capacity(self, capacity: usize) -> Self {
        Self {
            memo: Mutex::new(LruCache::new(Self::capacity(capacity))),
            ..self
        }
    }

    fn capacity(capacity: usize) -> NonZeroUsize {
        NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn artwork_dir(&self) -> &Path {
        &self.artwork_dir
    }

    /// Store artwork and return the reference to persist on the track.
    ///
    /// [`ArtworkData::Reference`] inputs are returned unchanged.
    pub async fn store(&self, artwork: &ArtworkData) -> Result<String> {
        match artwork {
            ArtworkData::Reference(uri) => Ok(uri.clone()),
            ArtworkData::Bytes { data, mime_type } => self.store_bytes(data, mime_type).await,
        }
    }

    async fn store_bytes(&self, data: &Bytes, mime_type: &str) -> Result<String> {
        if data.is_empty() {
            return Err(MetadataError::InvalidArtwork("Artwork is empty".to_string()));
        }

        let hash = artwork_hash(data);
        if let Some(path) = self.memoized(&hash).await? {
            return Ok(path);
        }

        let _writer = self.writer.lock().await;
        if let Some(path) = self.memoized(&hash).await? {
            return Ok(path);
        }

        if let Some(entry) = self.repository.find_by_hash(&hash).await? {
            if self.file_system.exists(Path::new(&entry.path)).await? {
                debug!(%hash, "Artwork already cached");
                self.memo.lock().await.put(hash, entry.path.clone());
                return Ok(entry.path);
            }
            debug!(%hash, path = %entry.path, "Cached artwork file missing, rewriting");
        }

        let path = self.artwork_dir.join(format!("{}.jpg", hash));
        self.file_system.create_dir_all(&self.artwork_dir).await?;
        self.file_system.write_file(&path, data.clone()).await?;

        let (width, height) = match image_dimensions(data) {
            Some((w, h)) => (Some(i64::from(w)), Some(i64::from(h))),
            None => (None, None),
        };
        let path = path.to_string_lossy().into_owned();

        self.repository
            .upsert(&ArtworkCacheEntry {
                hash: hash.clone(),
                path: path.clone(),
                mime_type: mime_type.to_string(),
                width,
                height,
                byte_size: data.len() as i64,
                source: "embedded".to_string(),
                created_at: self.clock.unix_timestamp(),
            })
            .await?;

        info!(%hash, bytes = data.len(), "Stored new artwork");
        self.memo.lock().await.put(hash, path.clone());
        Ok(path)
    }

    /// Memoized path whose file still exists
    async fn memoized(&self, hash: &str) -> Result<Option<String>> {
        let memoized = self.memo.lock().await.get(hash).cloned();
        match memoized {
            Some(path) if self.file_system.exists(Path::new(&path)).await? => Ok(Some(path)),
            Some(_) => {
                self.memo.lock().await.pop(hash);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Number of memoized entries
    pub async fn memo_len(&self) -> usize {
        self.memo.lock().await.len()
    }
}
