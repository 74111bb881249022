//! Stage timing.

use crate::core::StageKind;
use std::time::{Duration, Instant};
use tracing::trace;

/// Measures how long one stage process ran.
#[derive(Debug)]
pub struct StageTimer {
    stage: StageKind,
    started: Instant,
}

impl StageTimer {
    /// Starts timing `stage`.
    #[must_use]
    pub fn start(stage: StageKind) -> Self {
        trace!(%stage, "Stage timer started");
        Self {
            stage,
            started: Instant::now(),
        }
    }

    /// The stage being timed.
    #[must_use]
    pub fn stage(&self) -> StageKind {
        self.stage
    }

    /// Time since the stage started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stops the timer and returns the duration in whole milliseconds.
    #[must_use]
    pub fn finish(self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
