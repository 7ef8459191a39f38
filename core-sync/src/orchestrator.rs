//! # Scan Orchestrator
//!
//! Drives one library scan at a time through the indexer phases.
//!
//! ## Workflow
//!
//! 1. **Scanning**: enumerate every asset, diff fingerprints against the
//!    catalog, soft-delete tracks whose asset disappeared
//! 2. **Processing**: extract metadata in batches and write each batch in one
//!    transaction, publishing progress after every asset
//! 3. **Cleanup**: hard-delete soft-deleted tracks and prune orphans
//! 4. **Complete**: record bookkeeping in `indexer_state` and schedule the
//!    reset to `idle`
//!
//! ## Cancellation
//!
//! Each run owns a `CancellationToken`. It is checked at phase boundaries,
//! between provider pages and before every asset write. Committed batches
//! are kept, so a later non-forced scan picks up the remainder through
//! fingerprints.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{ScanOptions, ScanOrchestrator};
//! use std::sync::Arc;
//!
//! let orchestrator = Arc::new(ScanOrchestrator::builder(config, pool).build()?);
//! let handle = orchestrator.start_scan(ScanOptions::default()).await?;
//!
//! let mut progress = orchestrator.subscribe_progress();
//! while progress.changed().await.is_ok() {
//!     println!("{}%", progress.borrow().progress_percent());
//! }
//!
//! let outcome = handle.join().await?;
//! ```

use bridge_traits::time::{Clock, SystemClock};
use core_library::repositories::indexer_state::{
    LAST_FULL_SCAN_AT, LAST_SCAN_AT, LAST_SCAN_DELETED, LAST_SCAN_PROCESSED,
};
use core_library::repositories::{
    IndexerStateRepository, SqliteArtworkCacheRepository, SqliteIndexerStateRepository,
};
use core_library::CatalogWriter;
use core_metadata::artwork::ArtworkCache;
use core_metadata::extractor::MetadataExtractor;
use core_metadata::reader::{LoftyTagReader, TagReader};
use core_runtime::config::IndexerConfig;
use core_runtime::events::{CoreEvent, EventBus, IndexerEvent, LibraryEvent};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::enumerator::AssetEnumerator;
use crate::error::{Result, SyncError};
use crate::fingerprint;
use crate::processor::AssetProcessor;
use crate::publisher::{
    EventBusProgressPublisher, FanOutPublisher, ProgressPublisher, ProgressReceiver,
    WatchProgressPublisher,
};
use crate::state::{IndexerPhase, IndexerProgress, ScanOptions, ScanOutcome, ScanStats};

/// Phase and ownership of the current run
#[derive(Debug, Default)]
struct RunSlot {
    phase: IndexerPhase,
    /// Token of the latest accepted run; `0` before the first
    run_token: u64,
    cancel: Option<CancellationToken>,
}

/// A run started with [`ScanOrchestrator::start_scan`]
#[derive(Debug)]
pub struct ScanHandle {
    run_token: u64,
    handle: JoinHandle<Result<ScanOutcome>>,
}

impl ScanHandle {
    pub fn run_token(&self) -> u64 {
        self.run_token
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end
    pub async fn join(self) -> Result<ScanOutcome> {
        self.handle
            .await
            .map_err(|e| SyncError::Internal(format!("Scan task failed: {}", e)))?
    }
}

pub struct ScanOrchestrator {
    enumerator: AssetEnumerator,
    processor: AssetProcessor,
    writer: Arc<CatalogWriter>,
    state: Arc<dyn IndexerStateRepository>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    progress: Arc<WatchProgressPublisher>,
    publisher: Arc<dyn ProgressPublisher>,
    batch_size: usize,
    auto_reset_delay: Duration,
    slot: Arc<Mutex<RunSlot>>,
}

impl ScanOrchestrator {
    pub fn builder(config: IndexerConfig, pool: SqlitePool) -> ScanOrchestratorBuilder {
        ScanOrchestratorBuilder {
            config,
            pool,
            tag_reader: None,
            event_bus: None,
            clock: None,
            publishers: Vec::new(),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn writer(&self) -> &Arc<CatalogWriter> {
        &self.writer
    }

    /// Latest published progress
    pub fn progress(&self) -> IndexerProgress {
        self.progress.current()
    }

    pub fn subscribe_progress(&self) -> ProgressReceiver {
        self.progress.subscribe()
    }

    pub async fn phase(&self) -> IndexerPhase {
        self.slot.lock().await.phase
    }

    pub async fn is_scanning(&self) -> bool {
        self.slot.lock().await.phase.is_active()
    }

    /// Token of the latest accepted run, `0` when none has started
    pub async fn current_run_token(&self) -> u64 {
        self.slot.lock().await.run_token
    }

    // ========================================================================
    // Trigger surface
    // ========================================================================

    /// Start a run in the background.
    ///
    /// # Errors
    ///
    /// [`SyncError::ScanInProgress`] while another run is active.
    #[instrument(skip(self))]
    pub async fn start_scan(self: &Arc<Self>, options: ScanOptions) -> Result<ScanHandle> {
        let (run_token, cancel) = self.begin_run(options).await?;

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.execute(run_token, cancel, options).await });

        Ok(ScanHandle { run_token, handle })
    }

    /// Run a scan on the current task.
    #[instrument(skip(self))]
    pub async fn scan(&self, options: ScanOptions) -> Result<ScanOutcome> {
        let (run_token, cancel) = self.begin_run(options).await?;
        self.execute(run_token, cancel, options).await
    }

    /// Cancel the active run. Returns `false` when nothing was running.
    #[instrument(skip(self))]
    pub async fn stop_scan(&self) -> bool {
        let slot = self.slot.lock().await;
        match (&slot.cancel, slot.phase.is_active()) {
            (Some(cancel), true) => {
                info!(run_token = slot.run_token, phase = %slot.phase, "Cancelling scan");
                cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Same as [`stop_scan`](Self::stop_scan); progress is kept in the
    /// catalog's fingerprints.
    pub async fn pause_scan(&self) -> bool {
        self.stop_scan().await
    }

    /// Start a non-forced run that reconciles whatever a stopped run left.
    pub async fn resume_scan(self: &Arc<Self>) -> Result<ScanHandle> {
        self.start_scan(ScanOptions::default()).await
    }

    // ========================================================================
    // Run lifecycle
    // ========================================================================

    async fn begin_run(&self, options: ScanOptions) -> Result<(u64, CancellationToken)> {
        let mut slot = self.slot.lock().await;
        if slot.phase.is_active() {
            warn!(run_token = slot.run_token, phase = %slot.phase, "Scan already in progress");
            return Err(SyncError::ScanInProgress {
                run_token: slot.run_token,
            });
        }

        slot.phase = slot.phase.transition(IndexerPhase::Scanning)?;
        slot.run_token += 1;
        let cancel = CancellationToken::new();
        slot.cancel = Some(cancel.clone());
        let run_token = slot.run_token;
        self.publisher
            .publish(&IndexerProgress::new(IndexerPhase::Scanning, 0, 0));
        drop(slot);

        info!(
            run_token,
            force_full_scan = options.force_full_scan,
            "Starting library scan"
        );
        self.emit(IndexerEvent::Started {
            run_token,
            force_full_scan: options.force_full_scan,
        });
        self.emit(IndexerEvent::PhaseChanged {
            run_token,
            phase: IndexerPhase::Scanning.to_string(),
        });

        Ok((run_token, cancel))
    }

    async fn execute(
        &self,
        run_token: u64,
        cancel: CancellationToken,
        options: ScanOptions,
    ) -> Result<ScanOutcome> {
        let started = Instant::now();
        let mut stats = ScanStats::default();

        let result = self
            .run_phases(run_token, &cancel, options, &mut stats)
            .await;
        stats.set_duration(started.elapsed());

        match result {
            Ok(()) => {
                info!(
                    run_token,
                    processed = stats.processed,
                    failed = stats.failed,
                    deleted = stats.deleted,
                    unchanged = stats.unchanged,
                    duration_ms = stats.duration_ms,
                    "Library scan completed"
                );
                self.emit(IndexerEvent::Completed {
                    run_token,
                    processed: stats.processed,
                    failed: stats.failed,
                    deleted: stats.deleted,
                    unchanged: stats.unchanged,
                    duration_ms: stats.duration_ms,
                });
                self.schedule_reset(run_token);
                Ok(ScanOutcome::Completed(stats))
            }
            Err(SyncError::Cancelled) => {
                info!(run_token, processed = stats.processed, "Library scan cancelled");
                self.abort(run_token).await;
                self.emit(IndexerEvent::Cancelled {
                    run_token,
                    processed: stats.processed,
                });
                Ok(ScanOutcome::Cancelled(stats))
            }
            Err(e) => {
                error!(run_token, error = %e, "Library scan failed");
                self.abort(run_token).await;
                self.emit(IndexerEvent::Failed {
                    run_token,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        run_token: u64,
        cancel: &CancellationToken,
        options: ScanOptions,
        stats: &mut ScanStats,
    ) -> Result<()> {
        // Phase 1: enumerate and diff
        info!("Phase 1: Enumerating media assets");
        let assets = self.enumerator.list_audio_assets(cancel).await?;
        let catalog = self.writer.fingerprints().await?;
        let diff = fingerprint::diff(assets, &catalog, options.force_full_scan);
        let total = diff.to_process.len() as u64;
        stats.unchanged = diff.unchanged as u64;

        info!(
            to_process = total,
            to_delete = diff.to_delete.len(),
            unchanged = diff.unchanged,
            "Computed scan diff"
        );
        check_cancelled(cancel)?;

        if !diff.to_delete.is_empty() {
            stats.deleted = self.writer.soft_delete(&diff.to_delete).await?;
            self.emit_library(LibraryEvent::TracksRemoved {
                count: stats.deleted,
            });
        }
        self.publisher
            .publish(&IndexerProgress::new(IndexerPhase::Scanning, 0, total));
        check_cancelled(cancel)?;

        // Phase 2: extract and write in batches
        info!("Phase 2: Processing {} assets", total);
        self.enter_phase(run_token, IndexerPhase::Processing, 0, total)
            .await?;

        let mut current = 0u64;
        for batch in diff.to_process.chunks(self.batch_size) {
            check_cancelled(cancel)?;

            let entries = self.processor.prepare_batch(batch).await;
            let outcome = self.writer.write_batch(&entries, cancel).await?;

            stats.processed += outcome.written.len() as u64;
            stats.failed += outcome.failed.len() as u64;
            for (asset_id, reason) in &outcome.failed {
                warn!(%asset_id, %reason, "Skipping asset after failed write");
            }
            if !outcome.written.is_empty() {
                self.emit_library(LibraryEvent::CatalogUpdated {
                    tracks_written: outcome.written.len() as u64,
                });
            }

            let handled: HashSet<&str> = outcome
                .written
                .iter()
                .map(String::as_str)
                .chain(outcome.failed.iter().map(|(id, _)| id.as_str()))
                .collect();
            for entry in entries.iter().filter(|e| handled.contains(e.id.as_str())) {
                current += 1;
                if options.show_progress {
                    self.publisher.publish(
                        &IndexerProgress::new(IndexerPhase::Processing, current, total)
                            .with_current_file(entry.filename.clone()),
                    );
                }
            }

            if outcome.cancelled {
                return Err(SyncError::Cancelled);
            }

            debug!(processed = current, total, "Batch committed");
            tokio::task::yield_now().await;
        }
        check_cancelled(cancel)?;

        // Phase 3: purge and prune
        info!("Phase 3: Cleaning up removed tracks");
        self.enter_phase(run_token, IndexerPhase::Cleanup, 0, 0)
            .await?;
        let cleanup = self.writer.cleanup().await?;
        stats.purged = cleanup.tracks_purged;
        check_cancelled(cancel)?;

        // Phase 4: bookkeeping
        self.record_completion(options, stats).await?;
        self.enter_phase(run_token, IndexerPhase::Complete, total, total)
            .await?;

        Ok(())
    }

    /// Transition the slot and publish the new phase under the slot lock so
    /// an auto-reset cannot interleave.
    async fn enter_phase(
        &self,
        run_token: u64,
        phase: IndexerPhase,
        current: u64,
        total: u64,
    ) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if slot.run_token != run_token {
            return Err(SyncError::Internal(format!(
                "Run {} no longer owns the indexer (current run {})",
                run_token, slot.run_token
            )));
        }
        slot.phase = slot.phase.transition(phase)?;
        if !phase.is_active() {
            slot.cancel = None;
        }
        self.publisher
            .publish(&IndexerProgress::new(phase, current, total));
        drop(slot);

        self.emit(IndexerEvent::PhaseChanged {
            run_token,
            phase: phase.to_string(),
        });
        Ok(())
    }

    /// Return an unfinished run to `idle`.
    async fn abort(&self, run_token: u64) {
        let mut slot = self.slot.lock().await;
        if slot.run_token != run_token || !slot.phase.is_active() {
            return;
        }
        slot.phase = IndexerPhase::Idle;
        slot.cancel = None;
        self.publisher.publish(&IndexerProgress::idle());
        drop(slot);

        self.emit(IndexerEvent::PhaseChanged {
            run_token,
            phase: IndexerPhase::Idle.to_string(),
        });
    }

    /// Reset `complete` to `idle` after the configured delay unless a newer
    /// run took over.
    fn schedule_reset(&self, run_token: u64) {
        let slot = Arc::clone(&self.slot);
        let publisher = Arc::clone(&self.publisher);
        let event_bus = self.event_bus.clone();
        let delay = self.auto_reset_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut slot = slot.lock().await;
            if slot.run_token != run_token || slot.phase != IndexerPhase::Complete {
                debug!(run_token, "Skipping stale auto-reset");
                return;
            }
            slot.phase = IndexerPhase::Idle;
            publisher.publish(&IndexerProgress::idle());
            drop(slot);

            debug!(run_token, "Indexer reset to idle");
            event_bus
                .emit(CoreEvent::Indexer(IndexerEvent::PhaseChanged {
                    run_token,
                    phase: IndexerPhase::Idle.to_string(),
                }))
                .ok();
        });
    }

    async fn record_completion(&self, options: ScanOptions, stats: &ScanStats) -> Result<()> {
        let now = self.clock.unix_timestamp();
        let timestamp = now.to_string();

        self.state.set(LAST_SCAN_AT, &timestamp, now).await?;
        if options.force_full_scan {
            self.state.set(LAST_FULL_SCAN_AT, &timestamp, now).await?;
        }
        self.state
            .set(LAST_SCAN_PROCESSED, &stats.processed.to_string(), now)
            .await?;
        self.state
            .set(LAST_SCAN_DELETED, &stats.deleted.to_string(), now)
            .await?;
        Ok(())
    }

    fn emit(&self, event: IndexerEvent) {
        self.event_bus.emit(CoreEvent::Indexer(event)).ok();
    }

    fn emit_library(&self, event: LibraryEvent) {
        self.event_bus.emit(CoreEvent::Library(event)).ok();
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    Ok(())
}

// ============================================================================
// Builder
// ============================================================================

pub struct ScanOrchestratorBuilder {
    config: IndexerConfig,
    pool: SqlitePool,
    tag_reader: Option<Arc<dyn TagReader>>,
    event_bus: Option<EventBus>,
    clock: Option<Arc<dyn Clock>>,
    publishers: Vec<Arc<dyn ProgressPublisher>>,
}

impl ScanOrchestratorBuilder {
    /// Tag reader used for extraction; defaults to [`LoftyTagReader`]
    pub fn tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = Some(reader);
        self
    }

    /// Share an existing bus; a new one is created otherwise
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Additional progress publisher, called after the built-in ones
    pub fn publisher(mut self, publisher: Arc<dyn ProgressPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    /// # Errors
    ///
    /// - [`SyncError::Config`] when the configuration is invalid or has no
    ///   `FileSystemAccess` for the artwork cache
    pub fn build(self) -> Result<ScanOrchestrator> {
        let config = self.config;
        config.validate()?;

        let file_system = config.file_system.clone().ok_or_else(|| {
            core_runtime::Error::capability_missing(
                "FileSystemAccess",
                "The artwork cache needs file system access",
            )
        })?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(config.event_buffer_size));
        let tag_reader = self
            .tag_reader
            .unwrap_or_else(|| Arc::new(LoftyTagReader::new()));

        let progress = Arc::new(WatchProgressPublisher::new());
        let publisher = self.publishers.into_iter().fold(
            FanOutPublisher::new()
                .with(progress.clone())
                .with(Arc::new(EventBusProgressPublisher::new(event_bus.clone()))),
            FanOutPublisher::with,
        );

        let artwork = ArtworkCache::new(
            Arc::new(SqliteArtworkCacheRepository::new(self.pool.clone())),
            file_system,
            clock.clone(),
            config.artwork_dir(),
        );

        Ok(ScanOrchestrator {
            enumerator: AssetEnumerator::new(config.media_provider.clone(), config.page_size),
            processor: AssetProcessor::new(
                MetadataExtractor::new(tag_reader),
                Arc::new(artwork),
                config.extraction_concurrency,
            ),
            writer: Arc::new(CatalogWriter::new(self.pool.clone(), clock.clone())),
            state: Arc::new(SqliteIndexerStateRepository::new(self.pool)),
            event_bus,
            clock,
            progress,
            publisher: Arc::new(publisher),
            batch_size: config.batch_size,
            auto_reset_delay: config.auto_reset_delay,
            slot: Arc::new(Mutex::new(RunSlot::default())),
        })
    }
}
