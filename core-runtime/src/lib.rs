//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the indexing core:
//! - Logging and tracing infrastructure
//! - Indexer configuration
//! - Event bus system
//!
//! Every other core crate depends on this one for its logging conventions
//! and for the events it broadcasts to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{IndexerConfig, IndexerConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, IndexerEvent, LibraryEvent};
