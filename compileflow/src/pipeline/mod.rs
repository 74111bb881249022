//! Build planning and execution.
//!
//! This module provides:
//! - Stage specifications and the per-action build plan
//! - The build state machine
//! - The pipeline that drives stages through it
//! - A coordinator enforcing one live build per project

mod build;
mod cancellation;
mod coordinator;
mod plan;
mod spec;
mod state;

#[cfg(test)]
mod integration_tests;

pub use build::{BuildOutcome, BuildPipeline, BuildServices, PipelineControl};
pub use cancellation::CancellationToken;
pub use coordinator::{BuildCoordinator, BuildTicket, SUPERSEDED};
pub use plan::{
    census_spec, compiler_stage, compiler_switches, packager_stage, plan_for, translator_stage,
    BuildPlan, TEST_ME_INPUT,
};
pub use spec::StageSpec;
pub use state::{AbortReason, NextStep, PipelinePhase, PipelineState};
