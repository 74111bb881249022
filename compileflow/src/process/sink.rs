//! Output sinks and chunk observers.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Which of a child's output streams a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Append-only destination for a project's compiler output.
///
/// Chunks from one stream arrive in the order they were read; chunks from
/// different streams may interleave arbitrarily.
pub trait OutputSink: Send + Sync {
    /// Appends a chunk read from a child process.
    fn append(&self, stream: OutputStream, chunk: &[u8]);

    /// Appends text written by the build itself (invocation echo, exit codes).
    fn append_text(&self, text: &str) {
        self.append(OutputStream::Stdout, text.as_bytes());
    }
}

/// Sees every chunk without consuming it, e.g. to parse progress markers.
pub trait ChunkObserver: Send + Sync {
    /// Called once per chunk, after the chunk reached the sink.
    fn on_chunk(&self, stream: OutputStream, text: &str);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl OutputSink for NoOpSink {
    fn append(&self, _stream: OutputStream, _chunk: &[u8]) {}
}

/// A sink that keeps all output in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    bytes: Mutex<Vec<u8>>,
}

impl BufferSink {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffered output, decoding invalid UTF-8 lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Returns the number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    /// Returns true if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}

impl OutputSink for BufferSink {
    fn append(&self, _stream: OutputStream, chunk: &[u8]) {
        self.bytes.lock().extend_from_slice(chunk);
    }
}

/// A sink that logs each output line through `tracing` at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    target: String,
}

impl TracingSink {
    /// Creates a sink that tags lines with a label, e.g. the project name.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl OutputSink for TracingSink {
    fn append(&self, stream: OutputStream, chunk: &[u8]) {
        for line in String::from_utf8_lossy(chunk).lines() {
            debug!(sink = %self.target, ?stream, "{}", line);
        }
    }
}

/// Forwards to another sink while keeping a private copy of one stage's output.
///
/// The pipeline classifies a stage from this copy, so that output from an
/// earlier stage never influences the verdict of a later one.
pub struct StageCapture {
    inner: Arc<dyn OutputSink>,
    captured: Mutex<Vec<u8>>,
}

impl StageCapture {
    /// Wraps a project sink.
    #[must_use]
    pub fn new(inner: Arc<dyn OutputSink>) -> Self {
        Self {
            inner,
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Returns the stage's captured output.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.captured.lock()).into_owned()
    }
}

impl OutputSink for StageCapture {
    fn append(&self, stream: OutputStream, chunk: &[u8]) {
        self.captured.lock().extend_from_slice(chunk);
        self.inner.append(stream, chunk);
    }

    fn append_text(&self, text: &str) {
        // Build-generated text goes to the project sink only
        self.inner.append_text(text);
    }
}

impl std::fmt::Debug for StageCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageCapture")
            .field("captured_bytes", &self.captured.lock().len())
            .finish_non_exhaustive()
    }
}
