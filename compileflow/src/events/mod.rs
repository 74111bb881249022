//! Status reporting for running builds.
//!
//! The pipeline publishes every state change as a [`BuildEvent`] through a
//! [`StatusReporter`] passed in at construction; nothing is looked up
//! globally.
//!
//! [`BuildEvent`]: crate::core::BuildEvent

mod reporter;

pub use reporter::{
    ChannelStatusReporter, CollectingStatusReporter, LoggingStatusReporter, NoOpStatusReporter,
    StatusReporter,
};

use crate::context::ProjectId;
use crate::core::{BuildEvent, StatusUpdate};
use std::sync::Arc;

/// Stamps updates with a project and forwards them to a reporter.
#[derive(Clone)]
pub struct ProjectReporter {
    project: ProjectId,
    inner: Arc<dyn StatusReporter>,
}

impl ProjectReporter {
    /// Creates a reporter bound to one project.
    #[must_use]
    pub fn new(project: ProjectId, inner: Arc<dyn StatusReporter>) -> Self {
        Self { project, inner }
    }

    /// The project events are stamped with.
    #[must_use]
    pub fn project(&self) -> ProjectId {
        self.project
    }

    /// Publishes one update.
    pub fn publish(&self, update: StatusUpdate) {
        self.inner.report(&BuildEvent::new(self.project, update));
    }
}

impl std::fmt::Debug for ProjectReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectReporter")
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_reporter_stamps_project() {
        let collector = Arc::new(CollectingStatusReporter::new());
        let project = ProjectId::new();
        let reporter = ProjectReporter::new(project, collector.clone());

        reporter.publish(StatusUpdate::Pulse);

        let events = collector.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].project, project);
        assert_eq!(reporter.project(), project);
    }
}
