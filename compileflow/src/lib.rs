//! # Compileflow
//!
//! Build orchestration for a multi-stage story compiler toolchain.
//!
//! A build runs up to three external compilers in strict sequence:
//!
//! - **Translate**: natural-language source to intermediate code
//! - **Compile**: intermediate code to bytecode
//! - **Package**: bytecode plus release material to a blorb (releases only)
//!
//! Each stage's exit code and output are classified into a diagnostic; the
//! first stage that is not ok aborts the build. After the last stage an
//! action-specific finalization runs (launch the story, save the output,
//! refresh the index).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use compileflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ToolchainConfig::default().with_env_overrides();
//! let coordinator = BuildCoordinator::new(BuildServices::new(config.clone()));
//!
//! let ctx = ProjectContext::new("/stories/Cloak.inform");
//! let ticket = coordinator
//!     .request_build(BuildAction::Run, ctx, Arc::new(TracingSink::new("cloak")))
//!     .await;
//! match ticket.outcome().await {
//!     BuildOutcome::Failed { diagnostic } => {
//!         if let Some(resource) = &diagnostic.resource {
//!             println!("See {}", config.resolve(resource).display());
//!         }
//!     }
//!     _ => {}
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod classify;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod finalize;
pub mod observability;
pub mod pipeline;
pub mod process;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::classify::{classify, diagnose, ReportLocations, StageVerdict};
    pub use crate::config::ToolchainConfig;
    pub use crate::context::{ProjectContext, ProjectId};
    pub use crate::core::{
        BuildAction, BuildEvent, Diagnostic, DiagnosticKind, DiagnosticResource, KnownPattern,
        StageKind, StatusUpdate, StoryFormat,
    };
    pub use crate::errors::{CompileflowError, FinalizeError, SpawnError};
    pub use crate::events::{LoggingStatusReporter, NoOpStatusReporter, StatusReporter};
    pub use crate::finalize::{FinalizeHost, SaveRequest};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        plan_for, BuildCoordinator, BuildOutcome, BuildPipeline, BuildServices, BuildTicket,
        PipelineControl, PipelinePhase,
    };
    pub use crate::process::{
        BufferSink, CommandRunner, OutputSink, ProcessRunner, TracingSink,
    };
}
