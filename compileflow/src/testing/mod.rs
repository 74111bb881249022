//! Testing utilities for compileflow pipelines.
//!
//! This module provides:
//! - `ScriptedRunner`, a `CommandRunner` that replays scripted processes
//! - `RecordingHost`, a `FinalizeHost` that records its callbacks
//! - Project fixtures in throwaway directories

mod fixtures;
mod host;
mod runner;

pub use fixtures::ProjectFixture;
pub use host::{HostCall, RecordingHost};
pub use runner::{Invocation, Script, ScriptedRunner};
