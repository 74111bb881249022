//! The read-only project description a build works from.

use super::ProjectId;
use crate::core::{BuildAction, StoryFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the build subdirectory inside a project.
pub const BUILD_DIR: &str = "Build";
/// Problems report written by the translator.
pub const PROBLEMS_REPORT: &str = "Problems.html";
/// Status report written by the packager.
pub const PACKAGER_REPORT: &str = "StatusCblorb.html";
/// Intermediate code written by the translator.
pub const INTERMEDIATE_CODE: &str = "auto.inf";
/// Debug log written by the translator.
pub const DEBUG_LOG: &str = "Debug log.txt";
/// Packager manifest in the project root.
pub const RELEASE_MANIFEST: &str = "Release.blurb";
/// Bibliographic record written by the translator.
pub const IFICTION_RECORD: &str = "Metadata.iFiction";
/// Project identity file.
pub const UUID_FILE: &str = "uuid.txt";

/// Everything a pipeline needs to know about the project it builds.
///
/// Owned by the caller; the pipeline only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Routes output and status to the owning project.
    pub id: ProjectId,
    /// The project bundle directory (e.g. `My Story.inform`).
    pub root: PathBuf,
    /// Target virtual-machine format.
    #[serde(default)]
    pub format: StoryFormat,
    /// Ask the translator for a predictable random-number generator.
    #[serde(default)]
    pub alternate_rng: bool,
    /// Package release builds as a blorb.
    #[serde(default)]
    pub create_blorb: bool,
    /// Commands replayed into the story after a `Run` build.
    #[serde(default)]
    pub replay_inputs: Vec<String>,
}

impl ProjectContext {
    /// Creates a context with default settings for a project directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            id: ProjectId::new(),
            root: root.into(),
            format: StoryFormat::default(),
            alternate_rng: false,
            create_blorb: false,
            replay_inputs: Vec::new(),
        }
    }

    /// Sets the project ID.
    #[must_use]
    pub fn with_id(mut self, id: ProjectId) -> Self {
        self.id = id;
        self
    }

    /// Sets the story format.
    #[must_use]
    pub fn with_format(mut self, format: StoryFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the alternate RNG flag.
    #[must_use]
    pub fn with_alternate_rng(mut self, enabled: bool) -> Self {
        self.alternate_rng = enabled;
        self
    }

    /// Sets the packaging flag.
    #[must_use]
    pub fn with_blorb(mut self, enabled: bool) -> Self {
        self.create_blorb = enabled;
        self
    }

    /// Sets the replay inputs.
    #[must_use]
    pub fn with_replay_inputs(mut self, inputs: Vec<String>) -> Self {
        self.replay_inputs = inputs;
        self
    }

    /// The project's `Build` directory.
    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    /// Path of a file inside the `Build` directory.
    #[must_use]
    pub fn build_file(&self, name: &str) -> PathBuf {
        self.build_dir().join(name)
    }

    /// The translator's problems report.
    #[must_use]
    pub fn problems_report(&self) -> PathBuf {
        self.build_file(PROBLEMS_REPORT)
    }

    /// The packager's status report.
    #[must_use]
    pub fn packager_report(&self) -> PathBuf {
        self.build_file(PACKAGER_REPORT)
    }

    /// File name of the bytecode compiler's output, e.g. `output.z5`.
    #[must_use]
    pub fn story_file_name(&self) -> String {
        format!("output.{}", self.format.extension())
    }

    /// File name of the packager's output, e.g. `output.zblorb`.
    #[must_use]
    pub fn blorb_file_name(&self) -> String {
        format!("output.{}", self.format.blorb_extension())
    }

    /// The bare story file in `Build`.
    #[must_use]
    pub fn story_file(&self) -> PathBuf {
        self.build_file(&self.story_file_name())
    }

    /// The packaged story in `Build`.
    #[must_use]
    pub fn blorb_file(&self) -> PathBuf {
        self.build_file(&self.blorb_file_name())
    }

    /// Returns true if the action will run the packager.
    #[must_use]
    pub fn packages(&self, action: BuildAction) -> bool {
        action.is_release() && self.create_blorb
    }

    /// The file the action leaves behind for finalization to use.
    #[must_use]
    pub fn release_artifact(&self, action: BuildAction) -> PathBuf {
        if self.packages(action) {
            self.blorb_file()
        } else {
            self.story_file()
        }
    }

    /// The exported bibliographic record.
    #[must_use]
    pub fn ifiction_record(&self) -> PathBuf {
        self.root.join(IFICTION_RECORD)
    }

    /// The project name without its bundle extension.
    #[must_use]
    pub fn display_name(&self) -> String {
        display_stem(&self.root)
    }
}

fn display_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "Untitled".to_string(), |s| s.to_string_lossy().into_owned())
}
