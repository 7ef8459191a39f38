//! # Indexer State
//!
//! Phase state machine, progress snapshot and run results of the scan
//! orchestrator.
//!
//! ## Phases
//!
//! ```text
//! idle ──> scanning ──> processing ──> cleanup ──> complete ──> idle
//!            │              │             │            │
//!            └──────────────┴─────────────┴──> idle    └──> scanning
//!                    (cancelled or failed)          (next run)
//! ```
//!
//! `complete` is not an active phase: a new run may start from it, and the
//! orchestrator resets it to `idle` after a delay.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, SyncError};

// ============================================================================
// Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerPhase {
    #[default]
    Idle,
    Scanning,
    Processing,
    Cleanup,
    Complete,
}

impl IndexerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexerPhase::Idle => "idle",
            IndexerPhase::Scanning => "scanning",
            IndexerPhase::Processing => "processing",
            IndexerPhase::Cleanup => "cleanup",
            IndexerPhase::Complete => "complete",
        }
    }

    /// A run is in flight
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            IndexerPhase::Scanning | IndexerPhase::Processing | IndexerPhase::Cleanup
        )
    }

    pub fn can_transition_to(&self, to: IndexerPhase) -> bool {
        match (self, to) {
            // Run start
            (IndexerPhase::Idle, IndexerPhase::Scanning) => true,
            (IndexerPhase::Complete, IndexerPhase::Scanning) => true,

            // Forward progress
            (IndexerPhase::Scanning, IndexerPhase::Processing) => true,
            (IndexerPhase::Processing, IndexerPhase::Cleanup) => true,
            (IndexerPhase::Cleanup, IndexerPhase::Complete) => true,

            // Auto-reset
            (IndexerPhase::Complete, IndexerPhase::Idle) => true,

            // Cancellation or failure
            (from, IndexerPhase::Idle) if from.is_active() => true,

            _ => false,
        }
    }

    /// Validated transition; returns the new phase
    pub fn transition(self, to: IndexerPhase) -> Result<IndexerPhase> {
        if !self.can_transition_to(to) {
            return Err(SyncError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("Cannot transition from {} to {}", self.as_str(), to.as_str()),
            });
        }
        Ok(to)
    }
}

impl FromStr for IndexerPhase {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(IndexerPhase::Idle),
            "scanning" => Ok(IndexerPhase::Scanning),
            "processing" => Ok(IndexerPhase::Processing),
            "cleanup" => Ok(IndexerPhase::Cleanup),
            "complete" => Ok(IndexerPhase::Complete),
            _ => Err(SyncError::InvalidPhase(s.to_string())),
        }
    }
}

impl std::fmt::Display for IndexerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Snapshot published to hosts after phase changes and processed assets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerProgress {
    pub phase: IndexerPhase,
    pub current: u64,
    pub total: u64,
    pub current_file: Option<String>,
}

impl IndexerProgress {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn new(phase: IndexerPhase, current: u64, total: u64) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    pub fn with_current_file(mut self, file: impl Into<String>) -> Self {
        self.current_file = Some(file.into());
        self
    }

    pub fn is_indexing(&self) -> bool {
        self.phase.is_active()
    }

    /// Percentage in `0..=100`; `complete` always reports 100
    pub fn progress_percent(&self) -> u8 {
        if self.phase == IndexerPhase::Complete {
            return 100;
        }
        if self.total == 0 {
            return 0;
        }
        ((self.current.min(self.total) * 100) / self.total) as u8
    }
}

// ============================================================================
// Run options and results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Reprocess every asset regardless of fingerprint
    pub force_full_scan: bool,
    /// Publish per-asset progress; phase changes are always published
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            force_full_scan: false,
            show_progress: true,
        }
    }
}

impl ScanOptions {
    pub fn full() -> Self {
        Self {
            force_full_scan: true,
            ..Self::default()
        }
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Assets written to the catalog
    pub processed: u64,
    /// Assets whose write failed and were skipped
    pub failed: u64,
    /// Tracks soft-deleted because their asset disappeared
    pub deleted: u64,
    /// Assets skipped on a matching fingerprint
    pub unchanged: u64,
    /// Soft-deleted tracks removed during cleanup
    pub purged: u64,
    pub duration_ms: u64,
}

impl ScanStats {
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_ms = duration.as_millis() as u64;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(ScanStats),
    Cancelled(ScanStats),
}

impl ScanOutcome {
    pub fn stats(&self) -> &ScanStats {
        match self {
            ScanOutcome::Completed(stats) | ScanOutcome::Cancelled(stats) => stats,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanOutcome::Cancelled(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [IndexerPhase; 5] = [
        IndexerPhase::Idle,
        IndexerPhase::Scanning,
        IndexerPhase::Processing,
        IndexerPhase::Cleanup,
        IndexerPhase::Complete,
    ];

    #[test]
    fn test_happy_path_transitions() {
        let phase = IndexerPhase::Idle
            .transition(IndexerPhase::Scanning)
            .and_then(|p| p.transition(IndexerPhase::Processing))
            .and_then(|p| p.transition(IndexerPhase::Cleanup))
            .and_then(|p| p.transition(IndexerPhase::Complete))
            .and_then(|p| p.transition(IndexerPhase::Idle))
            .unwrap();
        assert_eq!(phase, IndexerPhase::Idle);
    }

    #[test]
    fn test_active_phases_can_abort_to_idle() {
        for phase in ALL.iter().filter(|p| p.is_active()) {
            assert!(phase.can_transition_to(IndexerPhase::Idle), "{phase}");
        }
        assert!(!IndexerPhase::Idle.can_transition_to(IndexerPhase::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(IndexerPhase::Idle
            .transition(IndexerPhase::Processing)
            .is_err());
        assert!(IndexerPhase::Scanning
            .transition(IndexerPhase::Cleanup)
            .is_err());
        assert!(IndexerPhase::Processing
            .transition(IndexerPhase::Scanning)
            .is_err());

        let err = IndexerPhase::Cleanup
            .transition(IndexerPhase::Scanning)
            .unwrap_err();
        match err {
            SyncError::InvalidStateTransition { from, to, .. } => {
                assert_eq!(from, "cleanup");
                assert_eq!(to, "scanning");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_new_run_may_start_from_complete() {
        assert!(!IndexerPhase::Complete.is_active());
        assert!(IndexerPhase::Complete.can_transition_to(IndexerPhase::Scanning));
    }

    #[test]
    fn test_phase_round_trips_through_str() {
        for phase in ALL {
            assert_eq!(phase.as_str().parse::<IndexerPhase>().unwrap(), phase);
        }
        assert!("paused".parse::<IndexerPhase>().is_err());
        assert_eq!(
            serde_json::to_string(&IndexerPhase::Cleanup).unwrap(),
            "\"cleanup\""
        );
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(IndexerProgress::idle().progress_percent(), 0);
        assert_eq!(
            IndexerProgress::new(IndexerPhase::Processing, 0, 0).progress_percent(),
            0
        );
        assert_eq!(
            IndexerProgress::new(IndexerPhase::Processing, 1, 3).progress_percent(),
            33
        );
        assert_eq!(
            IndexerProgress::new(IndexerPhase::Processing, 5, 3).progress_percent(),
            100
        );
        assert_eq!(
            IndexerProgress::new(IndexerPhase::Complete, 0, 0).progress_percent(),
            100
        );
    }

    #[test]
    fn test_is_indexing_follows_phase() {
        assert!(!IndexerProgress::idle().is_indexing());
        assert!(IndexerProgress::new(IndexerPhase::Scanning, 0, 0).is_indexing());
        assert!(!IndexerProgress::new(IndexerPhase::Complete, 3, 3).is_indexing());
    }

    #[test]
    fn test_scan_options() {
        let options = ScanOptions::default();
        assert!(!options.force_full_scan);
        assert!(options.show_progress);

        let options = ScanOptions::full().quiet();
        assert!(options.force_full_scan);
        assert!(!options.show_progress);
    }
}
