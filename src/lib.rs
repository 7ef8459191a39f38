//! Workspace re-export crate.
//!
//! This crate exposes shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-sync`). Host applications can
//! depend on `media-sync-workspace` and enable `desktop-shims` without wiring
//! each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{CoreError, CoreService};

#[cfg(feature = "desktop-shims")]
pub use core_sync::{IndexerPhase, IndexerProgress, ScanOptions, ScanOutcome, ScanStats};
