//! Status reporter trait and implementations.

use crate::core::BuildEvent;
use tokio::sync::mpsc;
use crate::core::StatusUpdate;
use tracing::{debug, info, trace, warn, Level};

/// Receives every status event a build publishes.
///
/// Implementations must not block: the pipeline calls `report` inline,
/// including from output-reading tasks.
pub trait StatusReporter: Send + Sync {
    /// Handles one event.
    fn report(&self, event: &BuildEvent);
}

/// A reporter that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStatusReporter;

impl StatusReporter for NoOpStatusReporter {
    fn report(&self, _event: &BuildEvent) {}
}

/// A reporter that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingStatusReporter {
    level: Level,
}

impl Default for LoggingStatusReporter {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingStatusReporter {
    /// Creates a logging reporter with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging reporter.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging reporter.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl StatusReporter for LoggingStatusReporter {
    fn report(&self, event: &BuildEvent) {
        let event_type = event.event_type();
        // Progress ticks are noisy; keep them out of info logs
        if matches!(event.update, StatusUpdate::Pulse | StatusUpdate::Progress { .. }) {
            trace!(project = %event.project, event_type, update = ?event.update, "Build progress");
            return;
        }
        match self.level {
            Level::TRACE | Level::DEBUG => {
                debug!(project = %event.project, event_type, update = ?event.update, "Event: {}", event_type);
            }
            Level::WARN | Level::ERROR => {
                warn!(project = %event.project, event_type, update = ?event.update, "Event: {}", event_type);
            }
            _ => {
                info!(project = %event.project, event_type, update = ?event.update, "Event: {}", event_type);
            }
        }
    }
}

/// A collecting reporter for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingStatusReporter {
    events: parking_lot::RwLock<Vec<BuildEvent>>,
}

impl CollectingStatusReporter {
    /// Creates a new collecting reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event type names, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(BuildEvent::event_type).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<BuildEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl StatusReporter for CollectingStatusReporter {
    fn report(&self, event: &BuildEvent) {
        self.events.write().push(event.clone());
    }
}

/// Forwards events into an unbounded channel, e.g. to a UI task.
#[derive(Debug, Clone)]
pub struct ChannelStatusReporter {
    tx: mpsc::UnboundedSender<BuildEvent>,
}

impl ChannelStatusReporter {
    /// Creates a reporter and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BuildEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusReporter for ChannelStatusReporter {
    fn report(&self, event: &BuildEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!(event_type = event.event_type(), "Status receiver dropped");
        }
    }
}
