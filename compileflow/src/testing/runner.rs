//! A scripted command runner for driving pipelines without real compilers.

use crate::errors::SpawnError;
use crate::process::{
    echo_invocation, ChunkObserver, CommandRunner, KillSwitch, OutputSink, OutputStream,
    ProcessExit, ProcessHandle,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// How one scripted process behaves.
#[derive(Debug, Clone)]
pub enum Script {
    /// Emits output, optionally waits, then exits with a code.
    Exit {
        /// Exit code.
        code: i32,
        /// Output emitted before exiting.
        chunks: Vec<(OutputStream, String)>,
        /// Files written relative to the working directory before exiting.
        files: Vec<(PathBuf, String)>,
        /// Delay before exiting; a kill during the delay terminates it.
        delay: Option<Duration>,
    },
    /// Emits output, then runs until killed.
    HangUntilKilled {
        /// Output emitted right away.
        chunks: Vec<(OutputStream, String)>,
    },
    /// The process cannot be started.
    SpawnFail,
}

impl Script {
    /// A process that exits with `code` and prints nothing.
    #[must_use]
    pub fn exit(code: i32) -> Self {
        Self::Exit {
            code,
            chunks: Vec::new(),
            files: Vec::new(),
            delay: None,
        }
    }

    /// A process that runs until killed.
    #[must_use]
    pub fn hang() -> Self {
        Self::HangUntilKilled { chunks: Vec::new() }
    }

    /// Adds a chunk of standard output.
    #[must_use]
    pub fn stdout(self, text: impl Into<String>) -> Self {
        self.chunk(OutputStream::Stdout, text)
    }

    /// Adds a chunk of standard error.
    #[must_use]
    pub fn stderr(self, text: impl Into<String>) -> Self {
        self.chunk(OutputStream::Stderr, text)
    }

    fn chunk(mut self, stream: OutputStream, text: impl Into<String>) -> Self {
        match self {
            Self::Exit { ref mut chunks, .. } | Self::HangUntilKilled { ref mut chunks } => {
                chunks.push((stream, text.into()));
            }
            Self::SpawnFail => {}
        }
        self
    }

    /// Writes a file (relative to the working directory) before exiting.
    #[must_use]
    pub fn creating(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        if let Self::Exit { ref mut files, .. } = self {
            files.push((path.into(), contents.into()));
        }
        self
    }

    /// Delays the exit.
    #[must_use]
    pub fn after(mut self, duration: Duration) -> Self {
        if let Self::Exit { ref mut delay, .. } = self {
            *delay = Some(duration);
        }
        self
    }
}

/// One recorded `run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The working directory.
    pub cwd: PathBuf,
    /// The argument vector.
    pub argv: Vec<String>,
}

impl Invocation {
    /// The executable.
    #[must_use]
    pub fn program(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }
}

/// Replays scripts in call order and records every invocation.
///
/// When the scripts run out, processes exit with code 0.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    scripts: Mutex<VecDeque<Script>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Creates a runner with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner with scripts for successive invocations.
    #[must_use]
    pub fn with_scripts(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Queues a script.
    pub fn push(&self, script: Script) {
        self.scripts.lock().push_back(script);
    }

    /// All invocations so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        cwd: &Path,
        argv: &[String],
        sink: Arc<dyn OutputSink>,
        observer: Option<Arc<dyn ChunkObserver>>,
    ) -> Result<ProcessHandle, SpawnError> {
        self.invocations.lock().push(Invocation {
            cwd: cwd.to_path_buf(),
            argv: argv.to_vec(),
        });
        let program = argv.first().ok_or(SpawnError::EmptyCommand)?.clone();
        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| Script::exit(0));

        if matches!(script, Script::SpawnFail) {
            return Err(SpawnError::io(
                program,
                std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            ));
        }

        sink.append_text(&echo_invocation(argv));
        let (kill, kill_rx) = KillSwitch::new();
        let (done_tx, done_rx) = oneshot::channel();
        let cwd = cwd.to_path_buf();
        tokio::spawn(async move {
            let exit = play(script, &cwd, sink.as_ref(), observer.as_deref(), kill_rx).await;
            let _ = done_tx.send(exit);
        });

        Ok(ProcessHandle::new(None, done_rx, kill))
    }
}

async fn play(
    script: Script,
    cwd: &Path,
    sink: &dyn OutputSink,
    observer: Option<&dyn ChunkObserver>,
    mut kill_rx: oneshot::Receiver<()>,
) -> ProcessExit {
    let emit = |chunks: &[(OutputStream, String)]| {
        for (stream, text) in chunks {
            sink.append(*stream, text.as_bytes());
            if let Some(observer) = observer {
                observer.on_chunk(*stream, text);
            }
        }
    };

    match script {
        Script::Exit {
            code,
            chunks,
            files,
            delay,
        } => {
            emit(&chunks);
            for (path, contents) in files {
                let path = cwd.join(path);
                if let Some(parent) = path.parent() {
                    let _ = tokio::fs::create_dir_all(parent).await;
                }
                let _ = tokio::fs::write(&path, contents).await;
            }
            if let Some(delay) = delay {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    Ok(()) = &mut kill_rx => return ProcessExit::Terminated,
                }
            }
            ProcessExit::Exited(code)
        }
        Script::HangUntilKilled { chunks } => {
            emit(&chunks);
            match kill_rx.await {
                Ok(()) => ProcessExit::Terminated,
                Err(_) => ProcessExit::Abnormal,
            }
        }
        Script::SpawnFail => ProcessExit::Abnormal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::BufferSink;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_scripts_play_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::with_scripts([
            Script::exit(1).stdout("Error: oops\n").creating("Build/Problems.html", "<p/>"),
            Script::SpawnFail,
        ]);
        let sink = Arc::new(BufferSink::new());

        let mut handle = runner
            .run(dir.path(), &argv(&["ni", "-project", "x"]), sink.clone(), None)
            .unwrap();
        assert_eq!(handle.wait().await, ProcessExit::Exited(1));
        assert!(sink.text().ends_with("Error: oops\n"));
        assert!(dir.path().join("Build/Problems.html").exists());

        let err = runner
            .run(dir.path(), &argv(&["inform6"]), sink.clone(), None)
            .unwrap_err();
        assert!(matches!(err, SpawnError::Io { .. }));

        // Exhausted scripts default to success
        let mut handle = runner.run(dir.path(), &argv(&["cBlorb"]), sink, None).unwrap();
        assert!(handle.wait().await.success());

        let programs: Vec<String> = runner
            .invocations()
            .iter()
            .map(|i| i.program().to_string())
            .collect();
        assert_eq!(programs, vec!["ni", "inform6", "cBlorb"]);
    }

    #[tokio::test]
    async fn test_hang_until_killed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::with_scripts([Script::hang()]);
        let mut handle = runner
            .run(dir.path(), &argv(&["inform6"]), Arc::new(BufferSink::new()), None)
            .unwrap();

        assert!(handle.terminate());
        assert_eq!(handle.wait().await, ProcessExit::Terminated);
    }

    #[tokio::test]
    async fn test_delayed_exit_can_be_killed() {
        let dir = tempfile::tempdir().unwrap();
        let runner =
            ScriptedRunner::with_scripts([Script::exit(0).after(Duration::from_secs(30))]);
        let mut handle = runner
            .run(dir.path(), &argv(&["ni"]), Arc::new(BufferSink::new()), None)
            .unwrap();

        handle.terminate();
        assert_eq!(handle.wait().await, ProcessExit::Terminated);
    }
}
