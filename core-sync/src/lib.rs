//! # Library Scan Engine
//!
//! Keeps the catalog database in step with the host media store.
//!
//! ## Overview
//!
//! A scan lists every audio asset, compares fingerprints against the
//! catalog, and only extracts and writes what changed:
//! - Listing assets page by page via `MediaAssetProvider`
//! - Fingerprint diffing into process, delete and unchanged sets
//! - Extracting metadata and artwork for changed assets
//! - Writing batches transactionally through `CatalogWriter`
//! - Purging removed tracks and pruning orphaned entities
//!
//! ## Components
//!
//! - **Fingerprints** (`fingerprint`): Change detection and diffing
//! - **Enumerator** (`enumerator`): Paginated, cancellable asset listing
//! - **State** (`state`): Phase state machine, progress and run results
//! - **Publishers** (`publisher`): Progress delivery to hosts
//! - **Processor** (`processor`): Extraction and artwork storage per asset
//! - **Orchestrator** (`orchestrator`): Single-flight scan runs

pub mod enumerator;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod processor;
pub mod publisher;
pub mod state;

pub use enumerator::AssetEnumerator;
pub use error::{Result, SyncError};
pub use fingerprint::{diff, fingerprint, PendingAsset, ScanDiff};
pub use orchestrator::{ScanHandle, ScanOrchestrator, ScanOrchestratorBuilder};
pub use processor::AssetProcessor;
pub use publisher::{
    EventBusProgressPublisher, FanOutPublisher, ProgressPublisher, ProgressReceiver,
    WatchProgressPublisher,
};
pub use state::{IndexerPhase, IndexerProgress, ScanOptions, ScanOutcome, ScanStats};
