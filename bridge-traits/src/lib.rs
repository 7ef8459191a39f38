//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the media sync core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform.
//!
//! ## Traits
//!
//! - [`MediaAssetProvider`](media::MediaAssetProvider) - Paginated listing of the device's audio assets
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Cache directory and artwork file I/O
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and include context such as paths or URIs in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared across the scan task and its callers.

pub mod error;
pub mod media;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use media::{AssetDescriptor, AssetPage, MediaAssetProvider, PermissionStatus};
pub use storage::FileSystemAccess;
pub use time::{Clock, FixedClock, SystemClock};
