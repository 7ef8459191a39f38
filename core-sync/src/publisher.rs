//! Progress publishing
//!
//! The orchestrator never stores progress in shared globals; it hands each
//! snapshot to a [`ProgressPublisher`] supplied by the host.

use core_runtime::events::{CoreEvent, EventBus, IndexerEvent};
use std::sync::Arc;
use tokio::sync::watch;

use crate::state::IndexerProgress;

/// Receiving side of [`WatchProgressPublisher`]
pub type ProgressReceiver = watch::Receiver<IndexerProgress>;

pub trait ProgressPublisher: Send + Sync {
    fn publish(&self, progress: &IndexerProgress);
}

/// Keeps the latest snapshot in a `watch` channel.
pub struct WatchProgressPublisher {
    sender: watch::Sender<IndexerProgress>,
}

impl WatchProgressPublisher {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(IndexerProgress::idle());
        Self { sender }
    }

    pub fn subscribe(&self) -> ProgressReceiver {
        self.sender.subscribe()
    }

    pub fn current(&self) -> IndexerProgress {
        self.sender.borrow().clone()
    }
}

impl Default for WatchProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPublisher for WatchProgressPublisher {
    fn publish(&self, progress: &IndexerProgress) {
        self.sender.send_replace(progress.clone());
    }
}

/// Emits each snapshot as [`IndexerEvent::Progress`].
pub struct EventBusProgressPublisher {
    event_bus: EventBus,
}

impl EventBusProgressPublisher {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

impl ProgressPublisher for EventBusProgressPublisher {
    fn publish(&self, progress: &IndexerProgress) {
        // No subscribers is not an error
        self.event_bus
            .emit(CoreEvent::Indexer(IndexerEvent::Progress {
                phase: progress.phase.to_string(),
                current: progress.current,
                total: progress.total,
                percent: progress.progress_percent(),
                current_file: progress.current_file.clone(),
            }))
            .ok();
    }
}

/// Forwards to several publishers in order.
#[derive(Default)]
pub struct FanOutPublisher {
    publishers: Vec<Arc<dyn ProgressPublisher>>,
}

impl FanOutPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, publisher: Arc<dyn ProgressPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

impl ProgressPublisher for FanOutPublisher {
    fn publish(&self, progress: &IndexerProgress) {
        for publisher in &self.publishers {
            publisher.publish(progress);
        }
    }
}
