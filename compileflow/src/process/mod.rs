//! Child-process spawning and output streaming.
//!
//! This module provides:
//! - `CommandRunner`, the seam the pipeline starts stages through
//! - `ProcessRunner`, its tokio implementation
//! - `ProcessHandle` with a completion event that always fires
//! - Output sinks and chunk observers
//! - Blocking helpers for the extension census

mod blocking;
mod handle;
mod runner;
mod sink;

pub use blocking::{census_argv, run_blocking, run_census, spawn_detached, CensusMode};
pub use handle::{KillSwitch, ProcessExit, ProcessHandle, ABNORMAL_EXIT_CODE};
pub use runner::{echo_invocation, CommandRunner, ProcessRunner};
pub use sink::{
    BufferSink, ChunkObserver, NoOpSink, OutputSink, OutputStream, StageCapture, TracingSink,
};
