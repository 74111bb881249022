//! Asynchronous process spawning with streamed output.

use super::{ChunkObserver, KillSwitch, OutputSink, OutputStream, ProcessExit, ProcessHandle};
use crate::errors::SpawnError;
use futures::future::join_all;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bytes read from a pipe per chunk.
const CHUNK_SIZE: usize = 1024;

/// How long output may keep arriving after the process exits.
///
/// A descendant that inherited the pipes can hold them open indefinitely;
/// its output is dropped once this elapses.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Starts external commands without blocking the caller.
///
/// Implemented by [`ProcessRunner`] for real processes and by
/// [`ScriptedRunner`](crate::testing::ScriptedRunner) in tests.
pub trait CommandRunner: Send + Sync {
    /// Starts `argv[0]` with the remaining arguments in `cwd`.
    ///
    /// Every chunk read from either output stream is appended to `sink`
    /// and then shown to `observer`. The returned handle's completion event
    /// fires once the process has exited, whether or not anything else still
    /// holds its output streams open.
    ///
    /// # Errors
    ///
    /// Returns a [`SpawnError`] immediately if the process cannot start.
    fn run(
        &self,
        cwd: &Path,
        argv: &[String],
        sink: Arc<dyn OutputSink>,
        observer: Option<Arc<dyn ChunkObserver>>,
    ) -> Result<ProcessHandle, SpawnError>;
}

/// Runs real child processes on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        cwd: &Path,
        argv: &[String],
        sink: Arc<dyn OutputSink>,
        observer: Option<Arc<dyn ChunkObserver>>,
    ) -> Result<ProcessHandle, SpawnError> {
        let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;
        if !cwd.is_dir() {
            return Err(SpawnError::MissingWorkingDirectory(cwd.to_path_buf()));
        }

        sink.append_text(&echo_invocation(argv));

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpawnError::io(program.clone(), e))?;

        let pid = child.id();
        debug!(program = %program, ?pid, cwd = %cwd.display(), "Spawned process");

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(
                stdout,
                OutputStream::Stdout,
                sink.clone(),
                observer.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(
                stderr,
                OutputStream::Stderr,
                sink,
                observer,
            )));
        }

        let (kill, kill_rx) = KillSwitch::new();
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(supervise(child, pumps, kill_rx, done_tx, program.clone()));

        Ok(ProcessHandle::new(pid, done_rx, kill))
    }
}

/// Formats the command line the way it is echoed into the sink.
#[must_use]
pub fn echo_invocation(argv: &[String]) -> String {
    match argv.split_first() {
        Some((program, args)) => format!("\n{} \\\n\t{}\n", program, args.join(" ")),
        None => String::new(),
    }
}

async fn pump<R>(
    mut reader: R,
    stream: OutputStream,
    sink: Arc<dyn OutputSink>,
    observer: Option<Arc<dyn ChunkObserver>>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = &buf[..n];
                sink.append(stream, chunk);
                if let Some(ref observer) = observer {
                    observer.on_chunk(stream, &String::from_utf8_lossy(chunk));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(?stream, error = %e, "Reading child output failed");
                break;
            }
        }
    }
}

async fn supervise(
    mut child: Child,
    mut pumps: Vec<JoinHandle<()>>,
    mut kill_rx: oneshot::Receiver<()>,
    done_tx: oneshot::Sender<ProcessExit>,
    program: String,
) {
    let exit = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ProcessExit::from_status(status),
            Err(e) => {
                warn!(program = %program, error = %e, "Waiting for process failed");
                ProcessExit::Abnormal
            }
        },
        Ok(()) = &mut kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!(program = %program, error = %e, "Killing process failed");
            }
            if let Err(e) = child.wait().await {
                warn!(program = %program, error = %e, "Reaping killed process failed");
            }
            ProcessExit::Terminated
        }
    };

    // Output written before a normal exit is still delivered first
    if exit != ProcessExit::Terminated {
        drain(&mut pumps, &program).await;
    }
    for pump in &pumps {
        pump.abort();
    }

    debug!(program = %program, ?exit, "Process finished");
    // The receiver may already be gone if the caller lost interest
    let _ = done_tx.send(exit);
}

/// Waits up to [`DRAIN_GRACE`] for the pumps to reach end of stream.
async fn drain(pumps: &mut [JoinHandle<()>], program: &str) {
    match tokio::time::timeout(DRAIN_GRACE, join_all(pumps.iter_mut())).await {
        Ok(results) => {
            for result in results {
                if let Err(e) = result {
                    warn!(program = %program, error = %e, "Output pump task failed");
                }
            }
        }
        Err(_) => {
            debug!(program = %program, "Output still open after exit, detaching");
        }
    }
}
