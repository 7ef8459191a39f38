//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host configuration into the indexing core: it opens
//! the catalog database, builds the scan orchestrator over the configured
//! media provider and file system, and exposes the scan triggers plus the
//! catalog repositories behind one handle. Desktop apps typically keep the
//! `desktop-shims` feature, which lets `IndexerConfig` fall back to library
//! folders and tokio file access when the host injects nothing.
//!
//! ```rust,ignore
//! use core_runtime::config::IndexerConfig;
//! use core_service::CoreService;
//! use core_sync::ScanOptions;
//!
//! let config = IndexerConfig::builder()
//!     .database_path("/data/library.db")
//!     .cache_dir("/data/cache")
//!     .library_root("/home/me/Music")
//!     .build()?;
//!
//! let core = CoreService::bootstrap(config).await?;
//! let handle = core.start_scan(ScanOptions::default()).await?;
//! handle.join().await?;
//! println!("{} tracks", core.tracks().count().await?);
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::indexer_state::{LAST_FULL_SCAN_AT, LAST_SCAN_AT};
use core_library::repositories::{
    AlbumRepository, ArtistRepository, ArtworkCacheRepository, GenreRepository,
    IndexerStateRepository, SqliteAlbumRepository, SqliteArtistRepository,
    SqliteArtworkCacheRepository, SqliteGenreRepository, SqliteIndexerStateRepository,
    SqliteTrackRepository, TrackRepository,
};
use core_metadata::reader::{LoftyTagReader, TagReader};
use core_runtime::config::IndexerConfig;
use core_runtime::events::EventStream;
use core_sync::{
    IndexerPhase, IndexerProgress, ProgressPublisher, ProgressReceiver, ScanHandle, ScanOptions,
    ScanOrchestrator, ScanOutcome,
};
use sqlx::SqlitePool;
use tracing::info;

/// Catalog read surface shared by the façade
struct Repositories {
    tracks: Arc<dyn TrackRepository>,
    artists: Arc<dyn ArtistRepository>,
    albums: Arc<dyn AlbumRepository>,
    genres: Arc<dyn GenreRepository>,
    artwork: Arc<dyn ArtworkCacheRepository>,
    indexer_state: Arc<dyn IndexerStateRepository>,
}

impl Repositories {
    fn new(pool: &SqlitePool) -> Self {
        Self {
            tracks: Arc::new(SqliteTrackRepository::new(pool.clone())),
            artists: Arc::new(SqliteArtistRepository::new(pool.clone())),
            albums: Arc::new(SqliteAlbumRepository::new(pool.clone())),
            genres: Arc::new(SqliteGenreRepository::new(pool.clone())),
            artwork: Arc::new(SqliteArtworkCacheRepository::new(pool.clone())),
            indexer_state: Arc::new(SqliteIndexerStateRepository::new(pool.clone())),
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<IndexerConfig>,
    pool: SqlitePool,
    orchestrator: Arc<ScanOrchestrator>,
    repositories: Arc<Repositories>,
}

impl CoreService {
    /// Open the catalog at `config.database_path` and read tags with lofty.
    pub async fn bootstrap(config: IndexerConfig) -> Result<Self> {
        Self::bootstrap_with_reader(config, Arc::new(LoftyTagReader::new())).await
    }

    /// Open the catalog with a host-provided tag reader.
    pub async fn bootstrap_with_reader(
        config: IndexerConfig,
        tag_reader: Arc<dyn TagReader>,
    ) -> Result<Self> {
        config.validate()?;

        if let (Some(fs), Some(parent)) = (&config.file_system, config.database_path.parent()) {
            if !parent.as_os_str().is_empty() {
                fs.create_dir_all(parent)
                    .await
                    .map_err(|source| CoreError::Storage {
                        path: parent.display().to_string(),
                        source,
                    })?;
            }
        }

        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        Self::with_pool(config, pool, tag_reader, None)
    }

    /// Build the service over an existing pool.
    ///
    /// `publisher` receives progress snapshots in addition to the built-in
    /// watch channel and event bus.
    pub fn with_pool(
        config: IndexerConfig,
        pool: SqlitePool,
        tag_reader: Arc<dyn TagReader>,
        publisher: Option<Arc<dyn ProgressPublisher>>,
    ) -> Result<Self> {
        let mut builder =
            ScanOrchestrator::builder(config.clone(), pool.clone()).tag_reader(tag_reader);
        if let Some(publisher) = publisher {
            builder = builder.publisher(publisher);
        }
        let orchestrator = builder.build()?;

        info!(
            database = %config.database_path.display(),
            page_size = config.page_size,
            batch_size = config.batch_size,
            "Core service ready"
        );

        Ok(Self {
            repositories: Arc::new(Repositories::new(&pool)),
            config: Arc::new(config),
            pool,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn orchestrator(&self) -> Arc<ScanOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    // ------------------------------------------------------------------
    // Scan triggers
    // ------------------------------------------------------------------

    pub async fn start_scan(&self, options: ScanOptions) -> Result<ScanHandle> {
        Ok(self.orchestrator.start_scan(options).await?)
    }

    pub async fn scan(&self, options: ScanOptions) -> Result<ScanOutcome> {
        Ok(self.orchestrator.scan(options).await?)
    }

    pub async fn stop_scan(&self) -> bool {
        self.orchestrator.stop_scan().await
    }

    pub async fn pause_scan(&self) -> bool {
        self.orchestrator.pause_scan().await
    }

    pub async fn resume_scan(&self) -> Result<ScanHandle> {
        Ok(self.orchestrator.resume_scan().await?)
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn progress(&self) -> IndexerProgress {
        self.orchestrator.progress()
    }

    pub fn subscribe_progress(&self) -> ProgressReceiver {
        self.orchestrator.subscribe_progress()
    }

    pub async fn phase(&self) -> IndexerPhase {
        self.orchestrator.phase().await
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.orchestrator.event_bus().subscribe())
    }

    /// Unix seconds of the last completed scan
    pub async fn last_scan_at(&self) -> Result<Option<i64>> {
        Ok(self.repositories.indexer_state.get_i64(LAST_SCAN_AT).await?)
    }

    /// Unix seconds of the last completed forced scan
    pub async fn last_full_scan_at(&self) -> Result<Option<i64>> {
        Ok(self
            .repositories
            .indexer_state
            .get_i64(LAST_FULL_SCAN_AT)
            .await?)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub fn tracks(&self) -> Arc<dyn TrackRepository> {
        Arc::clone(&self.repositories.tracks)
    }

    pub fn artists(&self) -> Arc<dyn ArtistRepository> {
        Arc::clone(&self.repositories.artists)
    }

    pub fn albums(&self) -> Arc<dyn AlbumRepository> {
        Arc::clone(&self.repositories.albums)
    }

    pub fn genres(&self) -> Arc<dyn GenreRepository> {
        Arc::clone(&self.repositories.genres)
    }

    pub fn artwork_cache(&self) -> Arc<dyn ArtworkCacheRepository> {
        Arc::clone(&self.repositories.artwork)
    }

    pub fn indexer_state(&self) -> Arc<dyn IndexerStateRepository> {
        Arc::clone(&self.repositories.indexer_state)
    }
}
