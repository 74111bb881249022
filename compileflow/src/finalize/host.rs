//! The surrounding application, as seen by finalization routines.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A save-location prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Dialog title, e.g. "Save the game for release".
    pub title: String,
    /// Suggested file name, e.g. `Cloak.zblorb`.
    pub suggested_name: String,
    /// Name of the file-type filter.
    pub filter_name: String,
    /// Glob patterns of the filter.
    pub patterns: Vec<String>,
}

impl SaveRequest {
    /// Creates a request with no filter.
    #[must_use]
    pub fn new(title: impl Into<String>, suggested_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            suggested_name: suggested_name.into(),
            filter_name: String::new(),
            patterns: Vec::new(),
        }
    }

    /// Sets the file-type filter.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, patterns: &[&str]) -> Self {
        self.filter_name = name.into();
        self.patterns = patterns.iter().map(|p| (*p).to_string()).collect();
        self
    }
}

/// Callbacks into the application that owns the project window.
///
/// Finalization awaits these; they may block on the user (e.g. a save
/// dialog) and must not start another build for the same project.
#[async_trait]
pub trait FinalizeHost: Send + Sync {
    /// Reloads the generated index and documentation views.
    ///
    /// `show` brings the index to the front.
    async fn refresh_index(&self, show: bool) -> anyhow::Result<()>;

    /// Starts the compiled story, replaying `replay` as player input.
    async fn launch(&self, story_file: &Path, replay: &[String]) -> anyhow::Result<()>;

    /// Asks where to save a file. `None` means the user cancelled.
    async fn choose_save_location(&self, request: &SaveRequest) -> anyhow::Result<Option<PathBuf>>;
}

/// A host with no user interface: nothing is shown, launched or saved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpFinalizeHost;

#[async_trait]
impl FinalizeHost for NoOpFinalizeHost {
    async fn refresh_index(&self, _show: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn launch(&self, _story_file: &Path, _replay: &[String]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn choose_save_location(&self, _request: &SaveRequest) -> anyhow::Result<Option<PathBuf>> {
        Ok(None)
    }
}
