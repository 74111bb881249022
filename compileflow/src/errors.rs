//! Error types for the compileflow crate.
//!
//! Stage failures are not errors in this taxonomy: a compiler that exits
//! with a bad code produces a [`Diagnostic`](crate::core::Diagnostic), not
//! an `Err`. The types here cover the plumbing around the stages.

use crate::core::PipelinePhaseName;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for compileflow operations.
#[derive(Debug, Error)]
pub enum CompileflowError {
    /// A stage process could not be started.
    #[error("{0}")]
    Spawn(#[from] SpawnError),

    /// A finalization routine failed.
    #[error("{0}")]
    Finalize(#[from] FinalizeError),

    /// The toolchain configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The pipeline state machine rejected a transition.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// Preparing the project for a build failed.
    #[error("Build setup failed: {0}")]
    Setup(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised when a child process cannot be started.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The argument vector was empty.
    #[error("Cannot run an empty command line")]
    EmptyCommand,

    /// The working directory does not exist.
    #[error("Working directory does not exist: {}", .0.display())]
    MissingWorkingDirectory(PathBuf),

    /// The operating system refused to start the process.
    #[error("Could not spawn process '{program}': {source}")]
    Io {
        /// The executable that failed to start.
        program: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl SpawnError {
    /// Creates an OS-level spawn error for a program.
    #[must_use]
    pub fn io(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            program: program.into(),
            source,
        }
    }
}

/// Errors raised by action-specific finalization routines.
#[derive(Debug, Error)]
pub enum FinalizeError {
    /// The compiled artifact to save or launch does not exist.
    #[error("Compiler output not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// The iFiction record was not produced by the compiler.
    #[error("The compiler failed to create an iFiction record; check the results page to see why.")]
    MissingIFiction(PathBuf),

    /// Moving or copying an artifact failed.
    #[error("Error copying file '{}' to '{}': {source}", from.display(), to.display())]
    Transfer {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The surrounding application failed to carry out a request.
    #[error("Host error during {operation}: {source}")]
    Host {
        /// What the host was asked to do.
        operation: &'static str,
        /// The host's error.
        #[source]
        source: anyhow::Error,
    },
}

impl FinalizeError {
    /// Wraps a host failure.
    #[must_use]
    pub fn host(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Host { operation, source }
    }
}

/// Errors raised while loading the toolchain configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read config file '{}': {source}", path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the schema.
    #[error("Invalid config file '{}': {source}", path.display())]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Error raised when the pipeline is asked to make an illegal transition.
#[derive(Debug, Clone, Error)]
#[error("Illegal pipeline transition from {from} on {event}")]
pub struct TransitionError {
    /// The phase the pipeline was in.
    pub from: PipelinePhaseName,
    /// The event that was rejected.
    pub event: &'static str,
}

impl TransitionError {
    /// Creates a new transition error.
    #[must_use]
    pub fn new(from: PipelinePhaseName, event: &'static str) -> Self {
        Self { from, event }
    }
}
