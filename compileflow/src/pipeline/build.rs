//! Running one build from start to finish.

use super::{
    plan_for, AbortReason, BuildPlan, CancellationToken, NextStep, PipelinePhase, PipelineState,
    StageSpec,
};
use crate::classify::{
    diagnose, spawn_failure, CompilerPulseObserver, FsProbe, ReportLocations, StageVerdict,
    TranslatorProgressObserver,
};
use crate::config::ToolchainConfig;
use crate::context::{ProjectContext, DEBUG_LOG, INTERMEDIATE_CODE, UUID_FILE};
use crate::core::{
    BuildAction, BuildArtifactKind, Diagnostic, DiagnosticKind, PipelinePhaseName, StageKind,
    StatusUpdate,
};
use crate::events::{LoggingStatusReporter, ProjectReporter, StatusReporter};
use crate::finalize::{finalize, FinalizeHost, NoOpFinalizeHost};
use crate::observability::StageTimer;
use crate::process::{
    ChunkObserver, CommandRunner, OutputSink, ProcessExit, ProcessRunner, StageCapture,
    ABNORMAL_EXIT_CODE,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// How a build ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuildOutcome {
    /// Every stage succeeded and the finalization ran.
    Succeeded {
        /// The action that was built.
        action: BuildAction,
        /// Where finalization saved a file, if it did.
        saved_to: Option<PathBuf>,
        /// The finalization error, if finalization failed.
        finalize_error: Option<String>,
    },
    /// A stage failed, or the project could not be prepared.
    Failed {
        /// The most specific diagnostic available.
        diagnostic: Diagnostic,
    },
    /// The build was stopped on request.
    Stopped {
        /// Why it was stopped.
        reason: String,
    },
}

impl BuildOutcome {
    /// Returns true for `Succeeded`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// The collaborators every build needs, shared across builds.
#[derive(Clone)]
pub struct BuildServices {
    /// Toolchain locations.
    pub config: Arc<ToolchainConfig>,
    /// Starts stage processes.
    pub runner: Arc<dyn CommandRunner>,
    /// Receives status events.
    pub reporter: Arc<dyn StatusReporter>,
    /// The application finalization talks to.
    pub host: Arc<dyn FinalizeHost>,
}

impl BuildServices {
    /// Real processes, logged status, and no user interface.
    #[must_use]
    pub fn new(config: ToolchainConfig) -> Self {
        Self {
            config: Arc::new(config),
            runner: Arc::new(ProcessRunner::new()),
            reporter: Arc::new(LoggingStatusReporter::default()),
            host: Arc::new(NoOpFinalizeHost),
        }
    }

    /// Sets the command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Sets the status reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the finalization host.
    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn FinalizeHost>) -> Self {
        self.host = host;
        self
    }
}

impl std::fmt::Debug for BuildServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Reads and stops a running build from outside.
#[derive(Debug, Clone)]
pub struct PipelineControl {
    state: Arc<Mutex<PipelineState>>,
    cancel: Arc<CancellationToken>,
}

impl PipelineControl {
    /// Stops the build.
    ///
    /// The build is `Aborted` when this returns; a stage process that exits
    /// afterwards causes no further transition. Returns false if the build
    /// was already over or finalizing.
    pub fn stop(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let aborted = self
            .state
            .lock()
            .abort(AbortReason::Stopped(reason.clone()));
        if aborted {
            self.cancel.cancel(reason);
        }
        aborted
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> PipelinePhase {
        self.state.lock().phase().clone()
    }

    /// The current phase name.
    #[must_use]
    pub fn phase_name(&self) -> PipelinePhaseName {
        self.state.lock().phase().name()
    }

    /// The stage running or last completed.
    #[must_use]
    pub fn current_stage(&self) -> Option<StageKind> {
        self.state.lock().current_stage()
    }
}

enum StageWait {
    Exited(ProcessExit),
    Cancelled,
}

/// The build was stopped while a stage was pending.
struct Interrupted;

/// One build of one project.
///
/// Stages run strictly in sequence: stage N+1 starts only after stage N
/// exited and classified as ok.
pub struct BuildPipeline {
    ctx: ProjectContext,
    plan: BuildPlan,
    sink: Arc<dyn OutputSink>,
    reporter: ProjectReporter,
    services: BuildServices,
    state: Arc<Mutex<PipelineState>>,
    cancel: Arc<CancellationToken>,
}

impl BuildPipeline {
    /// Plans a build of `ctx` for `action`, writing output to `sink`.
    #[must_use]
    pub fn new(
        action: BuildAction,
        ctx: ProjectContext,
        sink: Arc<dyn OutputSink>,
        services: &BuildServices,
    ) -> Self {
        let plan = plan_for(action, &ctx, &services.config);
        let state = PipelineState::new(action, plan.kinds());
        Self {
            reporter: ProjectReporter::new(ctx.id, services.reporter.clone()),
            ctx,
            plan,
            sink,
            services: services.clone(),
            state: Arc::new(Mutex::new(state)),
            cancel: Arc::new(CancellationToken::new()),
        }
    }

    /// The plan this pipeline will execute.
    #[must_use]
    pub fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    /// A handle for reading the phase and stopping the build.
    #[must_use]
    pub fn control(&self) -> PipelineControl {
        PipelineControl {
            state: self.state.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Runs the build to a terminal phase.
    pub async fn run(self) -> BuildOutcome {
        let span = info_span!(
            "build",
            project = %self.ctx.id,
            action = %self.plan.action,
            stages = self.plan.len()
        );
        async move {
            let outcome = self.execute().await;
            match &outcome {
                BuildOutcome::Succeeded { .. } => info!("Compiling succeeded."),
                BuildOutcome::Failed { diagnostic } => {
                    info!(stage = %diagnostic.stage, exit_code = diagnostic.exit_code, "Compiling failed.");
                }
                BuildOutcome::Stopped { reason } => info!(reason = %reason, "Compiling stopped."),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(&self) -> BuildOutcome {
        if let Err(e) = ensure_uuid_file(&self.ctx).await {
            let message = format!("Could not create {UUID_FILE}: {e}");
            if !self.state.lock().abort(AbortReason::Setup(message.clone())) {
                return self.stopped();
            }
            let diagnostic =
                Diagnostic::new(StageKind::Translate, DiagnosticKind::GenericError, ABNORMAL_EXIT_CODE)
                    .with_message(message);
            self.reporter.publish(StatusUpdate::Failed {
                diagnostic: diagnostic.clone(),
            });
            return BuildOutcome::Failed { diagnostic };
        }

        let started = self.state.lock().start();
        let mut index = match started {
            Ok(index) => index,
            Err(_) => return self.stopped(),
        };

        loop {
            let spec = &self.plan.stages[index];
            match self.run_stage(spec).await {
                Ok(true) => {}
                Ok(false) => {
                    // The diagnostic was published with the stage result
                    let failed = match self.state.lock().phase() {
                        PipelinePhase::Aborted(AbortReason::StageFailed(diagnostic)) => {
                            Some(diagnostic.clone())
                        }
                        _ => None,
                    };
                    return match failed {
                        Some(diagnostic) => BuildOutcome::Failed { diagnostic },
                        None => self.stopped(),
                    };
                }
                Err(Interrupted) => return self.stopped(),
            }

            let next = self.state.lock().advance();
            match next {
                Ok(NextStep::Stage(next)) => index = next,
                Ok(NextStep::Finalize) => break,
                Err(_) => return self.stopped(),
            }
        }

        self.finalize().await
    }

    /// Runs one stage and returns whether it succeeded.
    async fn run_stage(&self, spec: &StageSpec) -> Result<bool, Interrupted> {
        let kind = spec.kind;
        self.reporter.publish(StatusUpdate::StageStarted {
            stage: kind,
            message: kind.running_message().to_string(),
        });

        let capture = Arc::new(StageCapture::new(self.sink.clone()));
        let observer: Option<Arc<dyn ChunkObserver>> = match kind {
            StageKind::Translate => {
                Some(Arc::new(TranslatorProgressObserver::new(self.reporter.clone())))
            }
            StageKind::Compile => Some(Arc::new(CompilerPulseObserver::new(self.reporter.clone()))),
            StageKind::Package => None,
        };
        let argv = spec.argv();
        let timer = StageTimer::start(kind);

        // Spawn under the state lock so a stop cannot slip in between the
        // check and the spawn
        let spawned = {
            let state = self.state.lock();
            if state.phase().is_terminal() {
                return Err(Interrupted);
            }
            self.services
                .runner
                .run(&spec.cwd, &argv, capture.clone(), observer)
        };

        let (verdict, exit_code, spawn_error) = match spawned {
            Ok(mut handle) => {
                let kill = handle.kill_switch();
                let waited = tokio::select! {
                    exit = handle.wait() => StageWait::Exited(exit),
                    () = self.cancel.cancelled() => StageWait::Cancelled,
                };
                let exit = match waited {
                    StageWait::Exited(exit) => exit,
                    StageWait::Cancelled => {
                        kill.trigger();
                        let exit = handle.wait().await;
                        debug!(stage = %kind, ?exit, "Stopped stage process exited");
                        return Err(Interrupted);
                    }
                };
                if kind == StageKind::Compile {
                    self.sink
                        .append_text(&format!("\nCompiler finished with code {}\n", exit.code()));
                }
                let verdict = diagnose(
                    kind,
                    exit.code(),
                    &capture.text(),
                    &ReportLocations::new(&self.ctx, &self.services.config),
                    &FsProbe,
                );
                (verdict, exit.code(), None)
            }
            Err(e) => {
                warn!(stage = %kind, error = %e, "Stage could not be started");
                self.sink.append_text(&format!("\n{e}\n"));
                (spawn_failure(), ABNORMAL_EXIT_CODE, Some(e.to_string()))
            }
        };

        let mut diagnostic = verdict.to_diagnostic(kind, exit_code);
        if let Some(message) = spawn_error {
            diagnostic = diagnostic.with_message(message);
        }
        let duration_ms = timer.finish();
        info!(stage = %kind, exit_code, diagnostic = ?verdict.kind, duration_ms, "Stage finished");

        self.record_stage(kind, &verdict, diagnostic).await
    }

    async fn record_stage(
        &self,
        kind: StageKind,
        verdict: &StageVerdict,
        diagnostic: Diagnostic,
    ) -> Result<bool, Interrupted> {
        let completed = self.state.lock().complete_stage(verdict, diagnostic.clone());
        let succeeded = match completed {
            Ok(succeeded) => succeeded,
            Err(e) => {
                debug!(error = %e, "Ignoring stage result after stop");
                return Err(Interrupted);
            }
        };

        self.reporter.publish(StatusUpdate::StageFinished {
            diagnostic: diagnostic.clone(),
        });
        if !succeeded {
            self.reporter.publish(StatusUpdate::Failed { diagnostic });
            return Ok(false);
        }

        if kind == StageKind::Translate && self.services.config.show_debug_log {
            self.publish_debug_artifacts().await;
        }
        Ok(true)
    }

    async fn publish_debug_artifacts(&self) {
        for (artifact, name) in [
            (BuildArtifactKind::DebugLog, DEBUG_LOG),
            (BuildArtifactKind::IntermediateCode, INTERMEDIATE_CODE),
        ] {
            match tokio::fs::read_to_string(self.ctx.build_file(name)).await {
                Ok(contents) => self
                    .reporter
                    .publish(StatusUpdate::ArtifactLoaded { artifact, contents }),
                Err(e) => debug!(file = name, error = %e, "Debug artifact not loaded"),
            }
        }
    }

    async fn finalize(&self) -> BuildOutcome {
        let action = self.plan.action;
        let copy_destination = self.state.lock().copy_destination().map(PathBuf::from);

        let result = finalize(
            &self.plan.finalization,
            action,
            &self.ctx,
            copy_destination.as_deref(),
            self.services.host.as_ref(),
        )
        .await;

        if let Err(e) = self.state.lock().finish() {
            warn!(error = %e, "Finalization ended outside the finalizing phase");
        }

        let (saved_to, finalize_error) = match result {
            Ok(saved) => (saved, None),
            Err(e) => {
                warn!(error = %e, "Finalization failed");
                self.reporter.publish(StatusUpdate::FinalizeFailed {
                    message: e.to_string(),
                });
                (None, Some(e.to_string()))
            }
        };
        self.reporter.publish(StatusUpdate::Succeeded { action });
        BuildOutcome::Succeeded {
            action,
            saved_to,
            finalize_error,
        }
    }

    fn stopped(&self) -> BuildOutcome {
        let recorded = match self.state.lock().phase() {
            PipelinePhase::Aborted(AbortReason::Stopped(reason)) => Some(reason.clone()),
            _ => None,
        };
        let reason = recorded
            .or_else(|| self.cancel.reason())
            .unwrap_or_else(|| "Build stopped".to_string());
        self.reporter.publish(StatusUpdate::Stopped {
            reason: reason.clone(),
        });
        BuildOutcome::Stopped { reason }
    }
}

impl std::fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPipeline")
            .field("project", &self.ctx.id)
            .field("plan", &self.plan)
            .field("phase", self.state.lock().phase())
            .finish_non_exhaustive()
    }
}

/// Writes a fresh project UUID if the project has none.
async fn ensure_uuid_file(ctx: &ProjectContext) -> std::io::Result<()> {
    let path = ctx.root.join(UUID_FILE);
    if tokio::fs::try_exists(&path).await? {
        return Ok(());
    }
    let id = uuid::Uuid::new_v4().to_string();
    debug!(path = %path.display(), "Creating project UUID");
    tokio::fs::write(&path, id).await
}
