//! The build state machine.
//!
//! ```text
//! Idle ─start─▶ Running(i) ─ok─▶ StageSucceeded(i) ─advance─▶ Running(i+1)
//!                   │                      └──────advance──▶ Finalizing ─▶ Finished
//!                   └─not ok─▶ Aborted
//! ```
//!
//! `abort` moves any phase except `Finalizing` and the terminal phases to
//! `Aborted`. Every other transition out of `Aborted` or `Finished` is
//! rejected with a [`TransitionError`].

use crate::classify::StageVerdict;
use crate::core::{BuildAction, Diagnostic, PipelinePhaseName, StageKind};
use crate::errors::TransitionError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Why a build ended early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum AbortReason {
    /// A stage classified as anything other than ok.
    StageFailed(Diagnostic),
    /// Someone asked the build to stop.
    Stopped(String),
    /// The project could not be prepared for building.
    Setup(String),
}

/// Where a build is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Nothing has started.
    Idle,
    /// The stage at this index is running.
    Running(usize),
    /// The stage at this index classified as ok.
    StageSucceeded(usize),
    /// The finalization routine is running.
    Finalizing,
    /// Terminal: every stage and the finalization ran.
    Finished,
    /// Terminal: the build ended early.
    Aborted(AbortReason),
}

impl PipelinePhase {
    /// The phase without its payload.
    #[must_use]
    pub fn name(&self) -> PipelinePhaseName {
        match self {
            Self::Idle => PipelinePhaseName::Idle,
            Self::Running(_) => PipelinePhaseName::Running,
            Self::StageSucceeded(_) => PipelinePhaseName::StageSucceeded,
            Self::Finalizing => PipelinePhaseName::Finalizing,
            Self::Finished => PipelinePhaseName::Finished,
            Self::Aborted(_) => PipelinePhaseName::Aborted,
        }
    }

    /// Returns true for `Finished` and `Aborted`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.name().is_terminal()
    }
}

/// What the pipeline does after a stage succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Run the stage at this index.
    Stage(usize),
    /// Run the finalization routine.
    Finalize,
}

/// The state of one build.
///
/// Mutated once per completed stage, plus once each for start, finalize
/// and finish.
#[derive(Debug, Clone)]
pub struct PipelineState {
    action: BuildAction,
    stages: Vec<StageKind>,
    phase: PipelinePhase,
    copy_destination: Option<PathBuf>,
}

impl PipelineState {
    /// Creates an idle state for an ordered stage list.
    #[must_use]
    pub fn new(action: BuildAction, stages: Vec<StageKind>) -> Self {
        Self {
            action,
            stages,
            phase: PipelinePhase::Idle,
            copy_destination: None,
        }
    }

    /// The requested action.
    #[must_use]
    pub fn action(&self) -> BuildAction {
        self.action
    }

    /// The ordered stage list.
    #[must_use]
    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> &PipelinePhase {
        &self.phase
    }

    /// The stage running or last completed, if any.
    #[must_use]
    pub fn current_stage(&self) -> Option<StageKind> {
        match self.phase {
            PipelinePhase::Running(i) | PipelinePhase::StageSucceeded(i) => {
                self.stages.get(i).copied()
            }
            _ => None,
        }
    }

    /// Where the packager reported copying its result, if it did.
    #[must_use]
    pub fn copy_destination(&self) -> Option<&Path> {
        self.copy_destination.as_deref()
    }

    fn reject(&self, event: &'static str) -> TransitionError {
        TransitionError::new(self.phase.name(), event)
    }

    /// `Idle` to `Running(0)`.
    pub fn start(&mut self) -> Result<usize, TransitionError> {
        match self.phase {
            PipelinePhase::Idle if !self.stages.is_empty() => {
                self.phase = PipelinePhase::Running(0);
                Ok(0)
            }
            _ => Err(self.reject("start")),
        }
    }

    /// Records a classified stage: `Running(i)` to `StageSucceeded(i)` or
    /// `Aborted`.
    ///
    /// Returns true if the stage succeeded.
    pub fn complete_stage(
        &mut self,
        verdict: &StageVerdict,
        diagnostic: Diagnostic,
    ) -> Result<bool, TransitionError> {
        let PipelinePhase::Running(index) = self.phase else {
            return Err(self.reject("stage completed"));
        };
        if verdict.is_ok() {
            if verdict.copy_destination.is_some() {
                self.copy_destination.clone_from(&verdict.copy_destination);
            }
            self.phase = PipelinePhase::StageSucceeded(index);
            Ok(true)
        } else {
            self.phase = PipelinePhase::Aborted(AbortReason::StageFailed(diagnostic));
            Ok(false)
        }
    }

    /// `StageSucceeded(i)` to `Running(i+1)`, or to `Finalizing` after the
    /// last stage.
    pub fn advance(&mut self) -> Result<NextStep, TransitionError> {
        let PipelinePhase::StageSucceeded(index) = self.phase else {
            return Err(self.reject("advance"));
        };
        let next = index + 1;
        if next < self.stages.len() {
            self.phase = PipelinePhase::Running(next);
            Ok(NextStep::Stage(next))
        } else {
            self.phase = PipelinePhase::Finalizing;
            Ok(NextStep::Finalize)
        }
    }

    /// `Finalizing` to `Finished`.
    pub fn finish(&mut self) -> Result<(), TransitionError> {
        match self.phase {
            PipelinePhase::Finalizing => {
                self.phase = PipelinePhase::Finished;
                Ok(())
            }
            _ => Err(self.reject("finish")),
        }
    }

    /// Ends the build early.
    ///
    /// Returns false, changing nothing, once the build is finalizing or
    /// over.
    pub fn abort(&mut self, reason: AbortReason) -> bool {
        match self.phase {
            PipelinePhase::Finalizing | PipelinePhase::Finished | PipelinePhase::Aborted(_) => {
                false
            }
            _ => {
                self.phase = PipelinePhase::Aborted(reason);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DiagnosticKind, DiagnosticResource};

    fn ok() -> StageVerdict {
        StageVerdict {
            kind: DiagnosticKind::Ok,
            resource: None,
            copy_destination: None,
        }
    }

    fn failed() -> StageVerdict {
        StageVerdict {
            kind: DiagnosticKind::GenericError,
            resource: Some(DiagnosticResource::page("ErrorI6.html")),
            copy_destination: None,
        }
    }

    fn diag(verdict: &StageVerdict, stage: StageKind) -> Diagnostic {
        verdict.to_diagnostic(stage, 0)
    }

    fn two_stage() -> PipelineState {
        PipelineState::new(BuildAction::Run, vec![StageKind::Translate, StageKind::Compile])
    }

    #[test]
    fn test_happy_path() {
        let mut state = two_stage();
        assert_eq!(state.phase(), &PipelinePhase::Idle);

        assert_eq!(state.start().unwrap(), 0);
        assert_eq!(state.current_stage(), Some(StageKind::Translate));
        assert!(state.complete_stage(&ok(), diag(&ok(), StageKind::Translate)).unwrap());
        assert_eq!(state.advance().unwrap(), NextStep::Stage(1));
        assert_eq!(state.current_stage(), Some(StageKind::Compile));
        assert!(state.complete_stage(&ok(), diag(&ok(), StageKind::Compile)).unwrap());
        assert_eq!(state.advance().unwrap(), NextStep::Finalize);
        state.finish().unwrap();

        assert_eq!(state.phase(), &PipelinePhase::Finished);
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn test_failure_aborts() {
        let mut state = two_stage();
        state.start().unwrap();
        let diagnostic = diag(&failed(), StageKind::Translate);

        assert!(!state.complete_stage(&failed(), diagnostic.clone()).unwrap());
        assert_eq!(
            state.phase(),
            &PipelinePhase::Aborted(AbortReason::StageFailed(diagnostic))
        );
        // Nothing moves an aborted build
        assert!(state.advance().is_err());
        assert!(state.start().is_err());
    }

    #[test]
    fn test_stop_blocks_late_completion() {
        let mut state = two_stage();
        state.start().unwrap();
        assert!(state.abort(AbortReason::Stopped("user".into())));

        let err = state
            .complete_stage(&ok(), diag(&ok(), StageKind::Translate))
            .unwrap_err();
        assert_eq!(err.from, PipelinePhaseName::Aborted);
        assert_eq!(
            state.phase(),
            &PipelinePhase::Aborted(AbortReason::Stopped("user".into()))
        );

        // Stopping again changes nothing
        assert!(!state.abort(AbortReason::Stopped("again".into())));
    }

    #[test]
    fn test_finalizing_cannot_be_aborted() {
        let mut state = PipelineState::new(BuildAction::RefreshIndex, vec![StageKind::Translate]);
        state.start().unwrap();
        state.complete_stage(&ok(), diag(&ok(), StageKind::Translate)).unwrap();
        assert_eq!(state.advance().unwrap(), NextStep::Finalize);

        assert!(!state.abort(AbortReason::Stopped("late".into())));
        state.finish().unwrap();
    }

    #[test]
    fn test_copy_destination_is_threaded() {
        let mut state = PipelineState::new(
            BuildAction::Release,
            vec![StageKind::Translate, StageKind::Compile, StageKind::Package],
        );
        state.start().unwrap();
        for stage in [StageKind::Translate, StageKind::Compile] {
            state.complete_stage(&ok(), diag(&ok(), stage)).unwrap();
            state.advance().unwrap();
        }
        let verdict = StageVerdict {
            copy_destination: Some(PathBuf::from("/out/Story.zblorb")),
            ..ok()
        };
        state
            .complete_stage(&verdict, diag(&verdict, StageKind::Package))
            .unwrap();

        assert_eq!(state.copy_destination(), Some(Path::new("/out/Story.zblorb")));
    }

    #[test]
    fn test_empty_stage_list_cannot_start() {
        let mut state = PipelineState::new(BuildAction::Run, Vec::new());
        assert!(state.start().is_err());
    }
}
