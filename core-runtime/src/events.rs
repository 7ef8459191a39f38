//! Indexer and catalog notifications
//!
//! The orchestrator publishes every lifecycle step on a [`EventBus`] backed by
//! `tokio::sync::broadcast`. Hosts subscribe once and react to phase changes,
//! progress and catalog updates instead of polling. A subscriber that falls
//! more than the buffer size behind gets `RecvError::Lagged` and simply keeps
//! reading; progress events are superseded by later ones anyway.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, IndexerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut finished = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Indexer(IndexerEvent::Completed { .. })));
//!
//! bus.emit(CoreEvent::Indexer(IndexerEvent::Started { run_token: 1, force_full_scan: false }))
//!     .ok();
//! bus.emit(CoreEvent::Indexer(IndexerEvent::Completed {
//!     run_token: 1,
//!     processed: 3,
//!     failed: 0,
//!     deleted: 0,
//!     unchanged: 0,
//!     duration_ms: 12,
//! }))
//! .ok();
//!
//! assert!(finished.recv().await.unwrap().is_run_end());
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Events buffered per subscriber before it starts lagging
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Indexer(IndexerEvent),
    Library(LibraryEvent),
}

impl CoreEvent {
    /// True for the last event a run emits: completed, cancelled or failed.
    pub fn is_run_end(&self) -> bool {
        matches!(
            self,
            CoreEvent::Indexer(
                IndexerEvent::Completed { .. }
                    | IndexerEvent::Cancelled { .. }
                    | IndexerEvent::Failed { .. }
            )
        )
    }

    /// Run token carried by the event, if it belongs to a specific run.
    pub fn run_token(&self) -> Option<u64> {
        match self {
            CoreEvent::Indexer(IndexerEvent::Started { run_token, .. })
            | CoreEvent::Indexer(IndexerEvent::PhaseChanged { run_token, .. })
            | CoreEvent::Indexer(IndexerEvent::Completed { run_token, .. })
            | CoreEvent::Indexer(IndexerEvent::Cancelled { run_token, .. })
            | CoreEvent::Indexer(IndexerEvent::Failed { run_token, .. }) => Some(*run_token),
            _ => None,
        }
    }
}

/// Scan lifecycle. Phase names match `IndexerPhase::as_str`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum IndexerEvent {
    Started {
        run_token: u64,
        force_full_scan: bool,
    },
    PhaseChanged {
        run_token: u64,
        phase: String,
    },
    Progress {
        phase: String,
        current: u64,
        total: u64,
        /// 0-100
        percent: u8,
        current_file: Option<String>,
    },
    Completed {
        run_token: u64,
        processed: u64,
        /// Assets whose batch could not be written
        failed: u64,
        /// Tracks soft-deleted because their asset vanished
        deleted: u64,
        /// Assets skipped on a matching fingerprint
        unchanged: u64,
        duration_ms: u64,
    },
    Cancelled {
        run_token: u64,
        /// Assets committed before the stop took effect
        processed: u64,
    },
    Failed {
        run_token: u64,
        message: String,
    },
}

/// Catalog content changes, emitted after the write commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    CatalogUpdated { tracks_written: u64 },
    TracksRemoved { count: u64 },
}

/// Cloneable broadcast sender. Emitting with no subscribers returns
/// `Err(SendError)`, which publishers ignore with `.ok()`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New receiver; earlier events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events rejected by an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Next accepted event. Lagging is reported, not skipped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.as_ref().map_or(true, |accept| accept(&event)) {
                return Ok(event);
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(current: u64) -> CoreEvent {
        CoreEvent::Indexer(IndexerEvent::Progress {
            phase: "processing".to_string(),
            current,
            total: 10,
            percent: (current * 10) as u8,
            current_file: Some(format!("track-{current}.mp3")),
        })
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(4);
        assert!(bus.emit(progress(1)).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_event() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let started = CoreEvent::Indexer(IndexerEvent::Started {
            run_token: 7,
            force_full_scan: true,
        });
        assert_eq!(bus.emit(started.clone()).unwrap(), 2);
        assert_eq!(first.recv().await.unwrap(), started);
        assert_eq!(second.recv().await.unwrap(), started);
    }

    #[tokio::test]
    async fn test_stream_filter_skips_progress() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)));

        bus.emit(progress(1)).ok();
        let removed = CoreEvent::Library(LibraryEvent::TracksRemoved { count: 3 });
        bus.emit(removed.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), removed);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut receiver = bus.subscribe();
        for i in 0..5 {
            bus.emit(progress(i)).ok();
        }
        assert!(matches!(receiver.recv().await, Err(RecvError::Lagged(3))));
        // Reading resumes at the oldest retained event
        assert_eq!(receiver.recv().await.unwrap(), progress(3));
    }

    #[test]
    fn test_run_end_and_token() {
        let cancelled = CoreEvent::Indexer(IndexerEvent::Cancelled {
            run_token: 4,
            processed: 2,
        });
        assert!(cancelled.is_run_end());
        assert_eq!(cancelled.run_token(), Some(4));

        assert!(!progress(1).is_run_end());
        assert_eq!(progress(1).run_token(), None);
        assert_eq!(
            CoreEvent::Library(LibraryEvent::CatalogUpdated { tracks_written: 1 }).run_token(),
            None
        );
    }

    #[test]
    fn test_serialized_shape() {
        let event = CoreEvent::Indexer(IndexerEvent::Completed {
            run_token: 3,
            processed: 12,
            failed: 1,
            deleted: 2,
            unchanged: 40,
            duration_ms: 950,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Indexer\""));
        assert!(json.contains("\"event\":\"Completed\""));
        assert_eq!(serde_json::from_str::<CoreEvent>(&json).unwrap(), event);
    }
}
