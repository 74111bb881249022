//! Classified stage outcomes and the explanatory pages they point at.

use super::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A specific, recognized compiler failure with its own help page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownPattern {
    /// Translator exit code 10.
    TranslatorError10,
    /// Translator exit code 11.
    TranslatorError11,
    /// Translator crashed or exited with an unexpected code.
    ///
    /// Explained by `Error<code>.html` when that page ships, otherwise by
    /// the generic [`page`](Self::page).
    TranslatorInternal,
    /// "The memory setting ... has been exceeded."
    MemorySettingExceeded,
    /// "... overflowed the maximum readable-memory size ..."
    ReadableMemoryExceeded,
    /// "The story file exceeds ..."
    StoryFileTooBig,
}

impl KnownPattern {
    /// Stable identifier for logs and serialized events.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::TranslatorError10 => "Error10",
            Self::TranslatorError11 => "Error11",
            Self::TranslatorInternal => "Error0",
            Self::MemorySettingExceeded => "ErrorI6MemorySetting",
            Self::ReadableMemoryExceeded => "ErrorI6Readable",
            Self::StoryFileTooBig => "ErrorI6TooBig",
        }
    }

    /// Built-in documentation page explaining the failure.
    #[must_use]
    pub fn page(&self) -> String {
        format!("{}.html", self.id())
    }
}

impl fmt::Display for KnownPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The classified outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The stage succeeded.
    Ok,
    /// A recognized failure.
    KnownError {
        /// Which failure was recognized.
        pattern: KnownPattern,
    },
    /// A failure with no better classification than its exit code.
    GenericError,
    /// The stage process could not be started.
    SpawnFailure,
}

impl DiagnosticKind {
    /// Returns true only for `Ok`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Where the user can read about a stage's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "path", rename_all = "snake_case")]
pub enum DiagnosticResource {
    /// A page shipped with the tool's documentation (file name only).
    Documentation(String),
    /// A report the compiler generated inside the project.
    ProjectReport(PathBuf),
}

impl DiagnosticResource {
    /// A documentation page by file name.
    #[must_use]
    pub fn page(name: impl Into<String>) -> Self {
        Self::Documentation(name.into())
    }
}

/// A stage outcome as surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The stage this diagnostic belongs to.
    pub stage: StageKind,
    /// The classification.
    pub kind: DiagnosticKind,
    /// The page to show, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<DiagnosticResource>,
    /// Process exit code, or the sentinel when it did not exit normally.
    pub exit_code: i32,
    /// Extra detail, e.g. the OS error of a spawn failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Diagnostic {
    /// Creates a diagnostic without a resource or message.
    #[must_use]
    pub fn new(stage: StageKind, kind: DiagnosticKind, exit_code: i32) -> Self {
        Self {
            stage,
            kind,
            resource: None,
            exit_code,
            message: None,
        }
    }

    /// Sets the resource.
    #[must_use]
    pub fn with_resource(mut self, resource: Option<DiagnosticResource>) -> Self {
        self.resource = resource;
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.kind.is_ok()
    }
}
