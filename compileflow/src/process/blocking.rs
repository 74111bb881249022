//! Synchronous process helpers for auxiliary tasks outside the pipeline.
//!
//! These block the calling thread (or detach entirely) and must never be
//! used to run a build stage.

use super::ProcessExit;
use crate::config::ToolchainConfig;
use crate::errors::SpawnError;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Runs a command to completion, discarding its output.
///
/// # Errors
///
/// Returns a [`SpawnError`] if the process cannot start.
pub fn run_blocking(cwd: &Path, argv: &[String]) -> Result<ProcessExit, SpawnError> {
    let mut command = prepare(cwd, argv)?;
    let program = argv[0].clone();
    let status = command
        .status()
        .map_err(|e| SpawnError::io(program.clone(), e))?;
    let exit = ProcessExit::from_status(status);
    debug!(program = %program, ?exit, "Blocking process finished");
    Ok(exit)
}

/// Starts a command and forgets about it.
///
/// The child is reaped on a background thread so it never lingers as a
/// zombie.
///
/// # Errors
///
/// Returns a [`SpawnError`] if the process cannot start.
pub fn spawn_detached(cwd: &Path, argv: &[String]) -> Result<(), SpawnError> {
    let mut command = prepare(cwd, argv)?;
    let program = argv[0].clone();
    let mut child = command
        .spawn()
        .map_err(|e| SpawnError::io(program.clone(), e))?;
    debug!(program = %program, pid = child.id(), "Detached process started");

    std::thread::spawn(move || {
        if let Err(e) = child.wait() {
            warn!(program = %program, error = %e, "Detached process could not be reaped");
        }
    });
    Ok(())
}

fn prepare(cwd: &Path, argv: &[String]) -> Result<Command, SpawnError> {
    let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;
    if !cwd.is_dir() {
        return Err(SpawnError::MissingWorkingDirectory(cwd.to_path_buf()));
    }
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    Ok(command)
}

/// Argument vector for the translator's extension census.
#[must_use]
pub fn census_argv(config: &ToolchainConfig) -> Vec<String> {
    vec![
        config.natural_compiler.to_string_lossy().into_owned(),
        "-internal".to_string(),
        config.rules_dir.to_string_lossy().into_owned(),
        "-census".to_string(),
        "-silence".to_string(),
    ]
}

/// Whether to wait for the census to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CensusMode {
    /// Block until the census exits.
    Wait,
    /// Start it and return immediately.
    Detach,
}

/// Rebuilds the installed-extensions documentation.
///
/// Runs in `cwd` with all output discarded. Returns the exit status when
/// waiting, `None` when detached.
///
/// # Errors
///
/// Returns a [`SpawnError`] if the translator cannot start.
pub fn run_census(
    config: &ToolchainConfig,
    cwd: &Path,
    mode: CensusMode,
) -> Result<Option<ProcessExit>, SpawnError> {
    let argv = census_argv(config);
    info!(?mode, rules = %config.rules_dir.display(), "Running extension census");
    match mode {
        CensusMode::Wait => run_blocking(cwd, &argv).map(Some),
        CensusMode::Detach => spawn_detached(cwd, &argv).map(|()| None),
    }
}
