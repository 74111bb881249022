//! One live build per project.
//!
//! A new request for a project stops the build already running for it and
//! waits for that build to reach a terminal phase before the new pipeline
//! starts. Two pipelines for the same project are never active together.

use super::{BuildOutcome, BuildPipeline, BuildServices, PipelineControl, PipelinePhase};
use crate::context::{ProjectContext, ProjectId};
use crate::core::BuildAction;
use crate::process::OutputSink;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Reason given to a build stopped by a newer request.
pub const SUPERSEDED: &str = "Superseded by a new build";

type OutcomeReceiver = watch::Receiver<Option<BuildOutcome>>;

#[derive(Clone)]
struct ActiveBuild {
    action: BuildAction,
    control: PipelineControl,
    outcome: OutcomeReceiver,
}

#[derive(Default)]
struct ProjectSlot {
    // Serializes requests so stop-then-start is atomic per project
    gate: tokio::sync::Mutex<()>,
    active: Mutex<Option<ActiveBuild>>,
}

/// A started build.
#[derive(Debug)]
pub struct BuildTicket {
    project: ProjectId,
    action: BuildAction,
    control: PipelineControl,
    outcome: OutcomeReceiver,
}

impl BuildTicket {
    /// The project being built.
    #[must_use]
    pub fn project(&self) -> ProjectId {
        self.project
    }

    /// The action being built.
    #[must_use]
    pub fn action(&self) -> BuildAction {
        self.action
    }

    /// Reads and stops this build.
    #[must_use]
    pub fn control(&self) -> &PipelineControl {
        &self.control
    }

    /// Waits for the build to end.
    pub async fn outcome(mut self) -> BuildOutcome {
        await_outcome(&mut self.outcome).await
    }
}

async fn await_outcome(rx: &mut OutcomeReceiver) -> BuildOutcome {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone().unwrap_or_else(lost_outcome),
        Err(_) => lost_outcome(),
    }
}

fn lost_outcome() -> BuildOutcome {
    BuildOutcome::Stopped {
        reason: "Build task ended without an outcome".to_string(),
    }
}

/// Starts builds and keeps at most one running per project.
pub struct BuildCoordinator {
    services: BuildServices,
    projects: DashMap<ProjectId, Arc<ProjectSlot>>,
}

impl BuildCoordinator {
    /// Creates a coordinator whose builds share `services`.
    #[must_use]
    pub fn new(services: BuildServices) -> Self {
        Self {
            services,
            projects: DashMap::new(),
        }
    }

    /// The services builds run with.
    #[must_use]
    pub fn services(&self) -> &BuildServices {
        &self.services
    }

    fn slot(&self, project: ProjectId) -> Arc<ProjectSlot> {
        self.projects.entry(project).or_default().clone()
    }

    fn active(&self, project: ProjectId) -> Option<ActiveBuild> {
        let slot = self.projects.get(&project)?.clone();
        let active = slot.active.lock().clone();
        active
    }

    /// Starts a build of `ctx`, first stopping any build of the same
    /// project and waiting for it to end.
    ///
    /// Must be called within a tokio runtime; the build runs on a spawned
    /// task.
    pub async fn request_build(
        &self,
        action: BuildAction,
        ctx: ProjectContext,
        sink: Arc<dyn OutputSink>,
    ) -> BuildTicket {
        let project = ctx.id;
        let slot = self.slot(project);
        let _gate = slot.gate.lock().await;

        let previous = slot.active.lock().clone();
        if let Some(mut previous) = previous {
            if previous.control.stop(SUPERSEDED) {
                info!(project = %project, previous = %previous.action, "Stopped running build");
            }
            let outcome = await_outcome(&mut previous.outcome).await;
            debug!(project = %project, ?outcome, "Previous build ended");
        }

        let pipeline = BuildPipeline::new(action, ctx, sink, &self.services);
        let control = pipeline.control();
        let (tx, rx) = watch::channel(None);
        tokio::spawn(async move {
            let outcome = pipeline.run().await;
            if tx.send(Some(outcome)).is_err() {
                debug!("Build outcome had no listeners");
            }
        });

        *slot.active.lock() = Some(ActiveBuild {
            action,
            control: control.clone(),
            outcome: rx.clone(),
        });
        BuildTicket {
            project,
            action,
            control,
            outcome: rx,
        }
    }

    /// Stops the project's build. Returns false if nothing was stopped.
    pub fn stop(&self, project: ProjectId, reason: impl Into<String>) -> bool {
        let Some(active) = self.active(project) else {
            return false;
        };
        let stopped = active.control.stop(reason);
        if !stopped {
            warn!(project = %project, phase = %active.control.phase_name(), "Build cannot be stopped");
        }
        stopped
    }

    /// The phase of the project's latest build.
    #[must_use]
    pub fn phase(&self, project: ProjectId) -> Option<PipelinePhase> {
        self.active(project).map(|active| active.control.phase())
    }

    /// Returns true while the project's latest build is not over.
    #[must_use]
    pub fn is_building(&self, project: ProjectId) -> bool {
        self.phase(project).is_some_and(|phase| !phase.is_terminal())
    }

    /// Waits for the project's latest build to end.
    pub async fn wait(&self, project: ProjectId) -> Option<BuildOutcome> {
        let mut active = self.active(project)?;
        Some(await_outcome(&mut active.outcome).await)
    }
}

impl std::fmt::Debug for BuildCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildCoordinator")
            .field("projects", &self.projects.len())
            .finish_non_exhaustive()
    }
}
