//! Handles to running child processes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Exit code reported when a process did not exit normally.
pub const ABNORMAL_EXIT_CODE: i32 = -1;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "how", content = "code", rename_all = "snake_case")]
pub enum ProcessExit {
    /// The process exited with a code.
    Exited(i32),
    /// The process died without an exit code (e.g. a signal).
    Abnormal,
    /// The process was killed on request.
    Terminated,
}

impl ProcessExit {
    /// Converts an OS exit status.
    #[must_use]
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        status.code().map_or(Self::Abnormal, Self::Exited)
    }

    /// The exit code, or [`ABNORMAL_EXIT_CODE`].
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Abnormal | Self::Terminated => ABNORMAL_EXIT_CODE,
        }
    }

    /// Returns true for a zero exit code.
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

/// Requests termination of one process. Cloneable; fires at most once.
#[derive(Debug, Clone)]
pub struct KillSwitch {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl KillSwitch {
    /// Creates a switch and the receiver its supervisor listens on.
    #[must_use]
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Requests termination. Returns false if already triggered or the
    /// process has already been reaped.
    pub fn trigger(&self) -> bool {
        self.tx
            .lock()
            .take()
            .is_some_and(|tx| tx.send(()).is_ok())
    }

    /// Returns true once `trigger` has been called.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.tx.lock().is_none()
    }
}

/// A running process: its completion event and a way to stop it.
///
/// The completion event always fires, including after termination, so a
/// caller waiting on it is never left hanging.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    completion: oneshot::Receiver<ProcessExit>,
    kill: KillSwitch,
    exit: Option<ProcessExit>,
}

impl ProcessHandle {
    /// Assembles a handle from its parts.
    #[must_use]
    pub fn new(
        pid: Option<u32>,
        completion: oneshot::Receiver<ProcessExit>,
        kill: KillSwitch,
    ) -> Self {
        Self {
            pid,
            completion,
            kill,
            exit: None,
        }
    }

    /// The OS process ID, if known.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// A switch that can terminate the process from elsewhere.
    #[must_use]
    pub fn kill_switch(&self) -> KillSwitch {
        self.kill.clone()
    }

    /// Requests termination.
    pub fn terminate(&self) -> bool {
        self.kill.trigger()
    }

    /// Waits for the completion event.
    ///
    /// Cancel-safe; calling again after completion returns the same exit.
    pub async fn wait(&mut self) -> ProcessExit {
        if let Some(exit) = self.exit {
            return exit;
        }
        // A supervisor that vanished without reporting counts as abnormal
        let exit = (&mut self.completion).await.unwrap_or(ProcessExit::Abnormal);
        self.exit = Some(exit);
        exit
    }
}
