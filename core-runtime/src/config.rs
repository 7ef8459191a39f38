//! # Indexer Configuration
//!
//! Builder-based configuration for the media library indexer.
//!
//! ## Overview
//!
//! [`IndexerConfig`] holds the paths, tuning knobs and platform bridges the
//! indexing core needs. The builder fails fast with actionable messages when
//! a required capability is missing.
//!
//! ## Required
//!
//! - `database_path` - SQLite catalog location
//! - `cache_dir` - root for cached artwork
//! - `MediaAssetProvider` - the host media store
//!
//! ## Optional (with platform defaults)
//!
//! - `FileSystemAccess` - File I/O (desktop default: tokio fs)
//!
//! When the `desktop-shims` feature is enabled, a `DirectoryMediaProvider`
//! over the configured library roots (or the user's audio directory) is
//! injected if no provider was given.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::IndexerConfig;
//! use std::sync::Arc;
//!
//! let config = IndexerConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .cache_dir("/path/to/cache")
//!     .media_provider(Arc::new(MyMediaStore))
//!     .batch_size(20)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{FileSystemAccess, MediaAssetProvider};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Assets requested per provider page.
pub const DEFAULT_PAGE_SIZE: usize = 500;
/// Assets written per catalog transaction.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Concurrent tag reads within one batch.
pub const DEFAULT_EXTRACTION_CONCURRENCY: usize = 4;
/// Delay between `complete` and the automatic return to `idle`.
pub const DEFAULT_AUTO_RESET_DELAY: Duration = Duration::from_secs(3);
/// File extensions treated as audio by directory-based providers.
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "m4a", "aac", "ogg", "opus", "wav", "aiff", "aif", "wma", "ape", "wv",
];

/// Indexer configuration.
///
/// Use [`IndexerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct IndexerConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directory for cached files; artwork lands in `<cache_dir>/artwork`
    pub cache_dir: PathBuf,

    /// Library folders scanned by directory-based providers
    pub library_roots: Vec<PathBuf>,

    /// Host media store (required)
    pub media_provider: Arc<dyn MediaAssetProvider>,

    /// File system access abstraction (optional with desktop default)
    pub file_system: Option<Arc<dyn FileSystemAccess>>,

    /// Assets per provider page
    pub page_size: usize,

    /// Assets per catalog transaction
    pub batch_size: usize,

    /// Concurrent tag reads within a batch
    pub extraction_concurrency: usize,

    /// Delay before `complete` falls back to `idle`
    pub auto_reset_delay: Duration,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    /// Lowercase audio extensions without the leading dot
    pub audio_extensions: Vec<String>,
}

impl std::fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("database_path", &self.database_path)
            .field("cache_dir", &self.cache_dir)
            .field("library_roots", &self.library_roots)
            .field("media_provider", &"MediaAssetProvider { ... }")
            .field(
                "file_system",
                &self
                    .file_system
                    .as_ref()
                    .map(|_| "FileSystemAccess { ... }"),
            )
            .field("page_size", &self.page_size)
            .field("batch_size", &self.batch_size)
            .field("extraction_concurrency", &self.extraction_concurrency)
            .field("auto_reset_delay", &self.auto_reset_delay)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("audio_extensions", &self.audio_extensions)
            .finish()
    }
}

impl IndexerConfig {
    /// Creates a new builder for constructing an `IndexerConfig`.
    pub fn builder() -> IndexerConfigBuilder {
        IndexerConfigBuilder::default()
    }

    /// Directory holding content-addressed artwork files.
    pub fn artwork_dir(&self) -> PathBuf {
        self.cache_dir.join("artwork")
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path and cache directory are not empty
    /// - Page, batch, concurrency and buffer sizes are non-zero
    /// - At least one audio extension is configured
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        let sizes = [
            ("Page size", self.page_size),
            ("Batch size", self.batch_size),
            ("Extraction concurrency", self.extraction_concurrency),
            ("Event buffer size", self.event_buffer_size),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }

        if self.audio_extensions.is_empty() {
            return Err(Error::Config(
                "At least one audio extension must be configured".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_provider(
    _library_roots: &[PathBuf],
    _extensions: &[String],
) -> Result<Arc<dyn MediaAssetProvider>> {
    Err(Error::capability_missing(
        "MediaAssetProvider",
        "MediaAssetProvider implementation is required to enumerate audio assets. \
         Desktop: enable the 'desktop-shims' feature to scan library folders. \
         Mobile: inject the platform media store (MediaStore/MPMediaLibrary).",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_provider(
    library_roots: &[PathBuf],
    extensions: &[String],
) -> Result<Arc<dyn MediaAssetProvider>> {
    use bridge_desktop::DirectoryMediaProvider;

    let roots = if library_roots.is_empty() {
        match dirs::audio_dir() {
            Some(dir) => vec![dir],
            None => {
                return Err(Error::capability_missing(
                    "MediaAssetProvider",
                    "No library roots configured and no user audio directory found. \
                     Use .library_root() or inject a MediaAssetProvider.",
                ))
            }
        }
    } else {
        library_roots.to_vec()
    };

    tracing::debug!(roots = ?roots, "Using desktop library folders as media provider");
    let provider: Arc<dyn MediaAssetProvider> =
        Arc::new(DirectoryMediaProvider::new(roots).with_extensions(extensions.to_vec()));
    Ok(provider)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    let fs: Arc<dyn FileSystemAccess> = Arc::new(bridge_desktop::TokioFileSystem::new());
    Some(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    None
}

/// Builder for constructing [`IndexerConfig`] instances.
#[derive(Default)]
pub struct IndexerConfigBuilder {
    database_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    library_roots: Vec<PathBuf>,
    media_provider: Option<Arc<dyn MediaAssetProvider>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    page_size: Option<usize>,
    batch_size: Option<usize>,
    extraction_concurrency: Option<usize>,
    auto_reset_delay: Option<Duration>,
    event_buffer_size: Option<usize>,
    audio_extensions: Option<Vec<String>>,
}

impl IndexerConfigBuilder {
    /// Sets the database path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the cache directory.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Adds a library folder for directory-based providers.
    pub fn library_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.library_roots.push(path.into());
        self
    }

    /// Sets the media asset provider (required unless `desktop-shims` is enabled).
    pub fn media_provider(mut self, provider: Arc<dyn MediaAssetProvider>) -> Self {
        self.media_provider = Some(provider);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Assets requested per provider page. Default: 500
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Assets written per catalog transaction. Default: 10
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Concurrent tag reads within a batch. Default: 4
    pub fn extraction_concurrency(mut self, concurrency: usize) -> Self {
        self.extraction_concurrency = Some(concurrency);
        self
    }

    /// Delay before a completed run returns to idle. Default: 3 s
    pub fn auto_reset_delay(mut self, delay: Duration) -> Self {
        self.auto_reset_delay = Some(delay);
        self
    }

    /// Event bus buffer size. Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Replaces the audio extension allow-list.
    ///
    /// Extensions are matched case-insensitively; a leading dot is ignored.
    pub fn audio_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.audio_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        );
        self
    }

    /// Builds the final `IndexerConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a path is missing or a value is invalid
    /// - [`Error::CapabilityMissing`] when no media provider can be supplied
    pub fn build(self) -> Result<IndexerConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let audio_extensions = self.audio_extensions.unwrap_or_else(|| {
            DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect()
        });

        let media_provider = match self.media_provider {
            Some(provider) => provider,
            None => provide_default_media_provider(&self.library_roots, &audio_extensions)?,
        };

        let config = IndexerConfig {
            database_path,
            cache_dir,
            library_roots: self.library_roots,
            media_provider,
            file_system: self.file_system.or_else(provide_default_file_system),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            extraction_concurrency: self
                .extraction_concurrency
                .unwrap_or(DEFAULT_EXTRACTION_CONCURRENCY),
            auto_reset_delay: self.auto_reset_delay.unwrap_or(DEFAULT_AUTO_RESET_DELAY),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            audio_extensions,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::AssetPage;

    struct EmptyProvider;

    #[async_trait]
    impl MediaAssetProvider for EmptyProvider {
        async fn list_assets(
            &self,
            _cursor: Option<String>,
            _page_size: usize,
        ) -> BridgeResult<AssetPage> {
            Ok(AssetPage::default())
        }
    }

    fn base_builder() -> IndexerConfigBuilder {
        IndexerConfig::builder()
            .database_path("/tmp/library.db")
            .cache_dir("/tmp/cache")
            .media_provider(Arc::new(EmptyProvider))
    }

    #[test]
    fn test_builder_defaults() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.page_size, 500);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.extraction_concurrency, 4);
        assert_eq!(config.auto_reset_delay, Duration::from_secs(3));
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.audio_extensions.contains(&"flac".to_string()));
        assert_eq!(config.artwork_dir(), PathBuf::from("/tmp/cache/artwork"));
    }

    #[test]
    fn test_builder_requires_database_path() {
        let result = IndexerConfig::builder()
            .cache_dir("/tmp/cache")
            .media_provider(Arc::new(EmptyProvider))
            .build();

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("Database path")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_builder_requires_cache_dir() {
        let result = IndexerConfig::builder()
            .database_path("/tmp/library.db")
            .media_provider(Arc::new(EmptyProvider))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_media_provider() {
        let result = IndexerConfig::builder()
            .database_path("/tmp/library.db")
            .cache_dir("/tmp/cache")
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "MediaAssetProvider")
            }
            other => panic!("expected missing capability, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_builder_uses_directory_provider_with_roots() {
        let config = IndexerConfig::builder()
            .database_path("/tmp/library.db")
            .cache_dir("/tmp/cache")
            .library_root("/tmp/music")
            .build()
            .unwrap();

        assert_eq!(config.library_roots, vec![PathBuf::from("/tmp/music")]);
        assert!(config.file_system.is_some());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(matches!(
            base_builder().batch_size(0).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            base_builder().page_size(0).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            base_builder().extraction_concurrency(0).build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let result = IndexerConfig::builder()
            .database_path("")
            .cache_dir("/tmp/cache")
            .media_provider(Arc::new(EmptyProvider))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_audio_extensions_are_normalized() {
        let config = base_builder()
            .audio_extensions([".MP3", "Flac", ""])
            .build()
            .unwrap();

        assert_eq!(config.audio_extensions, vec!["mp3", "flac"]);
    }

    #[test]
    fn test_empty_extension_list_is_rejected() {
        let result = base_builder().audio_extensions(Vec::<String>::new()).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
