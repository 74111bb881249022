//! A finalization host that records what it was asked to do.

use crate::finalize::{FinalizeHost, SaveRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// One recorded host callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    /// `refresh_index` was called.
    RefreshIndex {
        /// Whether the index was brought to the front.
        show: bool,
    },
    /// `launch` was called.
    Launch {
        /// The story file launched.
        story_file: PathBuf,
        /// The replayed input.
        replay: Vec<String>,
    },
    /// `choose_save_location` was called.
    ChooseSaveLocation(SaveRequest),
}

/// Records callbacks and answers save prompts with a fixed location.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    save_location: Option<PathBuf>,
    failure: Option<String>,
}

impl RecordingHost {
    /// Creates a host that cancels every save prompt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers save prompts with `location`.
    #[must_use]
    pub fn with_save_location(mut self, location: Option<PathBuf>) -> Self {
        self.save_location = location;
        self
    }

    /// Makes every callback fail with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// All callbacks so far.
    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    /// The save prompts shown so far.
    #[must_use]
    pub fn save_requests(&self) -> Vec<SaveRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                HostCall::ChooseSaveLocation(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) -> anyhow::Result<()> {
        self.calls.lock().push(call);
        match self.failure {
            Some(ref message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FinalizeHost for RecordingHost {
    async fn refresh_index(&self, show: bool) -> anyhow::Result<()> {
        self.record(HostCall::RefreshIndex { show })
    }

    async fn launch(&self, story_file: &Path, replay: &[String]) -> anyhow::Result<()> {
        self.record(HostCall::Launch {
            story_file: story_file.to_path_buf(),
            replay: replay.to_vec(),
        })
    }

    async fn choose_save_location(&self, request: &SaveRequest) -> anyhow::Result<Option<PathBuf>> {
        self.record(HostCall::ChooseSaveLocation(request.clone()))?;
        Ok(self.save_location.clone())
    }
}
