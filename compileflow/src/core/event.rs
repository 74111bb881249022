//! Status events published by a running build.

use super::{BuildAction, Diagnostic, StageKind};
use crate::context::ProjectId;
use serde::{Deserialize, Serialize};

/// A generated file the build publishes for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildArtifactKind {
    /// `Build/Debug log.txt`
    DebugLog,
    /// `Build/auto.inf`
    IntermediateCode,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusUpdate {
    /// A stage process is about to start.
    StageStarted {
        /// The stage.
        stage: StageKind,
        /// Status-bar text.
        message: String,
    },
    /// Determinate progress parsed from compiler output.
    Progress {
        /// Completion between 0.0 and 1.0.
        fraction: f64,
        /// What the compiler says it is doing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Indeterminate progress tick.
    Pulse,
    /// A stage finished and was classified.
    StageFinished {
        /// The classified outcome.
        diagnostic: Diagnostic,
    },
    /// A generated file was read after a stage.
    ArtifactLoaded {
        /// Which file.
        artifact: BuildArtifactKind,
        /// Its text.
        contents: String,
    },
    /// All stages and the finalization ran.
    Succeeded {
        /// The action that was built.
        action: BuildAction,
    },
    /// A stage failed; the build is over.
    Failed {
        /// The most specific diagnostic available.
        diagnostic: Diagnostic,
    },
    /// The build was stopped on request.
    Stopped {
        /// Why it was stopped.
        reason: String,
    },
    /// Stages succeeded but the finalization routine failed.
    FinalizeFailed {
        /// The error text.
        message: String,
    },
}

impl StatusUpdate {
    /// Dotted event name, e.g. `stage.started`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StageStarted { .. } => "stage.started",
            Self::Progress { .. } => "stage.progress",
            Self::Pulse => "stage.pulse",
            Self::StageFinished { .. } => "stage.finished",
            Self::ArtifactLoaded { .. } => "artifact.loaded",
            Self::Succeeded { .. } => "build.succeeded",
            Self::Failed { .. } => "build.failed",
            Self::Stopped { .. } => "build.stopped",
            Self::FinalizeFailed { .. } => "finalize.failed",
        }
    }

    /// Status-bar text for terminal updates.
    #[must_use]
    pub fn summary(&self) -> Option<&'static str> {
        match self {
            Self::Succeeded { .. } => Some("Compiling succeeded."),
            Self::Failed { .. } => Some("Compiling failed."),
            Self::Stopped { .. } => Some("Compiling stopped."),
            _ => None,
        }
    }
}

/// A status update stamped with its project and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    /// The project whose build emitted the event.
    pub project: ProjectId,
    /// When the event occurred (RFC 3339).
    pub timestamp: String,
    /// The update itself.
    #[serde(flatten)]
    pub update: StatusUpdate,
}

impl BuildEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(project: ProjectId, update: StatusUpdate) -> Self {
        Self {
            project,
            timestamp: chrono::Utc::now().to_rfc3339(),
            update,
        }
    }

    /// Dotted event name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.update.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DiagnosticKind;

    #[test]
    fn test_event_type_names() {
        assert_eq!(StatusUpdate::Pulse.event_type(), "stage.pulse");
        assert_eq!(
            StatusUpdate::Stopped { reason: "user".into() }.event_type(),
            "build.stopped"
        );
    }

    #[test]
    fn test_summaries() {
        let failed = StatusUpdate::Failed {
            diagnostic: Diagnostic::new(StageKind::Translate, DiagnosticKind::GenericError, 1),
        };
        assert_eq!(failed.summary(), Some("Compiling failed."));
        assert_eq!(StatusUpdate::Pulse.summary(), None);
    }

    #[test]
    fn test_event_serializes_flat() {
        let project = ProjectId::new();
        let event = BuildEvent::new(
            project,
            StatusUpdate::Progress {
                fraction: 0.5,
                message: Some("Binding rulebooks".into()),
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["fraction"], 0.5);
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
