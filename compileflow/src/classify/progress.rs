//! Progress markers parsed from streamed compiler output.

use crate::core::StatusUpdate;
use crate::events::ProjectReporter;
use crate::process::{ChunkObserver, OutputStream};
use regex::Regex;
use std::sync::OnceLock;

fn progress_regex() -> &'static Regex {
    static PROGRESS: OnceLock<Regex> = OnceLock::new();
    PROGRESS.get_or_init(|| {
        Regex::new(r"^\s*\+\+\s*(\d{1,3})%\s*\(([^)]*)").expect("Invalid progress regex")
    })
}

/// Parses a translator progress line such as ` ++ 40% (Binding rulebooks)`.
///
/// Returns the completion fraction and the message.
#[must_use]
pub fn parse_progress(line: &str) -> Option<(f64, String)> {
    let caps = progress_regex().captures(line)?;
    let percent: u32 = caps.get(1)?.as_str().parse().ok()?;
    let message = caps.get(2)?.as_str().trim().to_string();
    Some((f64::from(percent.min(100)) / 100.0, message))
}

/// Publishes determinate progress from translator output.
#[derive(Debug, Clone)]
pub struct TranslatorProgressObserver {
    reporter: ProjectReporter,
}

impl TranslatorProgressObserver {
    /// Creates an observer publishing through `reporter`.
    #[must_use]
    pub fn new(reporter: ProjectReporter) -> Self {
        Self { reporter }
    }
}

impl ChunkObserver for TranslatorProgressObserver {
    fn on_chunk(&self, _stream: OutputStream, text: &str) {
        for (fraction, message) in text.lines().filter_map(parse_progress) {
            self.reporter.publish(StatusUpdate::Progress {
                fraction,
                message: (!message.is_empty()).then_some(message),
            });
        }
    }
}

/// Publishes an indeterminate tick whenever the bytecode compiler prints `#`.
#[derive(Debug, Clone)]
pub struct CompilerPulseObserver {
    reporter: ProjectReporter,
}

impl CompilerPulseObserver {
    /// Creates an observer publishing through `reporter`.
    #[must_use]
    pub fn new(reporter: ProjectReporter) -> Self {
        Self { reporter }
    }
}

impl ChunkObserver for CompilerPulseObserver {
    fn on_chunk(&self, _stream: OutputStream, text: &str) {
        if text.contains('#') {
            self.reporter.publish(StatusUpdate::Pulse);
        }
    }
}
