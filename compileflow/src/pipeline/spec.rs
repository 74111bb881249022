//! Stage specifications.

use crate::core::StageKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One compiler invocation: what to run, with which arguments, and where.
///
/// Built fresh for each stage from the project context and action; never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Which compiler this stage runs.
    pub kind: StageKind,
    /// The executable, resolved through `PATH` when relative.
    pub program: PathBuf,
    /// Arguments after the executable.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
}

impl StageSpec {
    /// Creates a stage specification with no arguments.
    #[must_use]
    pub fn new(kind: StageKind, program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a path argument.
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The full argument vector, executable first.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}
