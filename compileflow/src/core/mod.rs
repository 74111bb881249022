//! Core domain model types for compileflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Build action, stage kind and story format enums
//! - Diagnostics produced by classifying a finished stage
//! - Status events published while a build runs

mod diagnostic;
mod event;
mod status;

pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticResource, KnownPattern};
pub use event::{BuildArtifactKind, BuildEvent, StatusUpdate};
pub use status::{BuildAction, PipelinePhaseName, StageKind, StoryFormat};
