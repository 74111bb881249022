//! Build action, stage kind, story format and phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of build the user asked for.
///
/// Chosen once per pipeline run; decides which stages execute and what
/// happens after they succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildAction {
    /// Translate the source only and refresh the index views.
    RefreshIndex,
    /// Compile and launch the story.
    Run,
    /// Compile, launch and replay the story's built-in test script.
    TestMe,
    /// Compile for release, optionally package, and save the result.
    Release,
    /// Compile with debugging enabled and save the story file.
    SaveDebugBuild,
    /// Translate the source and export the bibliographic record.
    SaveIFiction,
}

impl BuildAction {
    /// All actions, in menu order.
    pub const ALL: [Self; 6] = [
        Self::RefreshIndex,
        Self::Run,
        Self::TestMe,
        Self::Release,
        Self::SaveDebugBuild,
        Self::SaveIFiction,
    ];

    /// Returns true if the action needs the bytecode compiler stage.
    #[must_use]
    pub fn needs_bytecode(&self) -> bool {
        !matches!(self, Self::RefreshIndex | Self::SaveIFiction)
    }

    /// Returns true if this is a release build.
    #[must_use]
    pub fn is_release(&self) -> bool {
        matches!(self, Self::Release)
    }
}

impl fmt::Display for BuildAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefreshIndex => write!(f, "refresh_index"),
            Self::Run => write!(f, "run"),
            Self::TestMe => write!(f, "test_me"),
            Self::Release => write!(f, "release"),
            Self::SaveDebugBuild => write!(f, "save_debug_build"),
            Self::SaveIFiction => write!(f, "save_ifiction"),
        }
    }
}

/// Which external compiler a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Stage 1: natural-language source to intermediate code.
    Translate,
    /// Stage 2: intermediate code to virtual-machine bytecode.
    Compile,
    /// Stage 3: wrap the bytecode and resources into a distributable.
    Package,
}

impl StageKind {
    /// Status-bar message shown while the stage runs.
    #[must_use]
    pub fn running_message(&self) -> &'static str {
        match self {
            Self::Translate => "Running Natural Inform...",
            Self::Compile => "Running Inform 6...",
            Self::Package => "Running cBlorb...",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translate => write!(f, "translate"),
            Self::Compile => write!(f, "compile"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// Target virtual-machine format of the compiled story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoryFormat {
    /// Z-machine version 5.
    #[default]
    Z5,
    /// Z-machine version 6.
    Z6,
    /// Z-machine version 8.
    Z8,
    /// Glulx.
    Glulx,
}

impl StoryFormat {
    /// File extension of the bare story file.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Z5 => "z5",
            Self::Z6 => "z6",
            Self::Z8 => "z8",
            Self::Glulx => "ulx",
        }
    }

    /// File extension of the packaged story.
    #[must_use]
    pub fn blorb_extension(&self) -> &'static str {
        match self {
            Self::Glulx => "gblorb",
            _ => "zblorb",
        }
    }

    /// Version selector passed to the bytecode compiler.
    #[must_use]
    pub fn compiler_switch(&self) -> &'static str {
        match self {
            Self::Z5 => "v5",
            Self::Z6 => "v6",
            Self::Z8 => "v8",
            Self::Glulx => "G",
        }
    }

    /// Human-readable name and glob patterns for save dialogs.
    #[must_use]
    pub fn file_filter(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Glulx => ("Glulx games (.ulx,.gblorb)", &["*.ulx", "*.gblorb"]),
            _ => ("Z-code games (.z?,.zblorb)", &["*.z?", "*.zblorb"]),
        }
    }
}

impl fmt::Display for StoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Name of a pipeline phase without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhaseName {
    /// Nothing has started.
    Idle,
    /// A stage process is running.
    Running,
    /// A stage finished and classified as ok.
    StageSucceeded,
    /// The action's finalization routine is running.
    Finalizing,
    /// Terminal: all stages and finalization done.
    Finished,
    /// Terminal: a stage failed or the build was stopped.
    Aborted,
}

impl PipelinePhaseName {
    /// Returns true for `Finished` and `Aborted`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }
}

impl fmt::Display for PipelinePhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::StageSucceeded => write!(f, "stage_succeeded"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Finished => write!(f, "finished"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}
