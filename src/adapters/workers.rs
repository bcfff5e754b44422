use crate::domain::model::WorkerExit;
use crate::domain::ports::{WorkerHandle, WorkerSpawner};
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Strips any role flags from the primary's own arguments so they can be
/// forwarded to a worker.
pub fn forwarded_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut forwarded = Vec::new();
    let mut skip_value = false;

    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        let (flag, inline) = {
            let text = arg.to_string_lossy();
            (
                text == "--role" || text == "--worker-id",
                text.starts_with("--role=") || text.starts_with("--worker-id="),
            )
        };
        if flag {
            skip_value = true;
            continue;
        }
        if !inline {
            forwarded.push(arg);
        }
    }

    forwarded
}

/// Starts each worker as a child process running this same binary.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessSpawner {
    pub fn new(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }

    /// Re-executes the current executable with the given primary arguments.
    pub fn current_exe<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = OsString>,
    {
        let program = std::env::current_exe().map_err(|e| BenchError::WorkerError {
            message: format!("Failed to get current exe: {}", e),
        })?;
        Ok(Self::new(program, forwarded_args(args)))
    }

    pub fn command(&self, slot: usize) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--role")
            .arg("worker")
            .arg("--worker-id")
            .arg(slot.to_string())
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        // Workers must not outlive a primary that dies without cleaning up.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        cmd
    }
}

#[async_trait]
impl WorkerSpawner for ProcessSpawner {
    async fn spawn(&self, slot: usize) -> Result<Box<dyn WorkerHandle>> {
        debug!("Spawning worker process for slot {}", slot);

        let child = self.command(slot).spawn().map_err(|e| BenchError::WorkerError {
            message: format!("Failed to spawn worker {}: {}", slot, e),
        })?;
        let pid = child.id();

        Ok(Box::new(ProcessHandle { slot, pid, child }))
    }
}

pub struct ProcessHandle {
    slot: usize,
    pid: Option<u32>,
    child: Child,
}

#[async_trait]
impl WorkerHandle for ProcessHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn wait(&mut self) -> Result<WorkerExit> {
        let status = self.child.wait().await?;
        Ok(WorkerExit::from_status(self.slot, self.pid, status))
    }

    async fn kill(&mut self) -> Result<()> {
        self.child.kill().await?;
        Ok(())
    }
}

/// Body of a thread worker. Returning ends the worker.
pub type WorkerMain = Arc<dyn Fn(usize) -> Result<()> + Send + Sync>;

/// Runs each worker on its own OS thread; used where re-executing the
/// binary is not wanted.
#[derive(Clone)]
pub struct ThreadSpawner {
    main: WorkerMain,
}

impl ThreadSpawner {
    pub fn new(main: WorkerMain) -> Self {
        Self { main }
    }
}

/// Reports the thread's end to its handle, including when it unwinds.
struct ExitReporter {
    slot: usize,
    tx: Option<oneshot::Sender<WorkerExit>>,
}

impl ExitReporter {
    fn report(&mut self, code: Option<i32>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(WorkerExit {
                slot: self.slot,
                pid: None,
                code,
                signal: None,
            });
        }
    }
}

impl Drop for ExitReporter {
    fn drop(&mut self) {
        // Still armed here only if the worker panicked.
        self.report(None);
    }
}

#[async_trait]
impl WorkerSpawner for ThreadSpawner {
    async fn spawn(&self, slot: usize) -> Result<Box<dyn WorkerHandle>> {
        let (tx, rx) = oneshot::channel();
        let main = self.main.clone();

        std::thread::Builder::new()
            .name(format!("fibload-worker-{}", slot))
            .spawn(move || {
                let mut reporter = ExitReporter { slot, tx: Some(tx) };
                match main(slot) {
                    Ok(()) => reporter.report(Some(0)),
                    Err(e) => {
                        error!("worker {} failed: {}", slot, e);
                        reporter.report(Some(1));
                    }
                }
            })
            .map_err(|e| BenchError::WorkerError {
                message: format!("Failed to start worker thread {}: {}", slot, e),
            })?;

        Ok(Box::new(ThreadHandle {
            slot,
            exit_rx: Some(rx),
        }))
    }
}

pub struct ThreadHandle {
    slot: usize,
    exit_rx: Option<oneshot::Receiver<WorkerExit>>,
}

#[async_trait]
impl WorkerHandle for ThreadHandle {
    fn pid(&self) -> Option<u32> {
        None
    }

    async fn wait(&mut self) -> Result<WorkerExit> {
        let rx = self.exit_rx.take().ok_or_else(|| BenchError::WorkerError {
            message: format!("worker {} was already reaped", self.slot),
        })?;
        rx.await.map_err(|_| BenchError::WorkerError {
            message: format!("worker {} vanished without reporting", self.slot),
        })
    }

    async fn kill(&mut self) -> Result<()> {
        // Threads cannot be killed; they end with the process.
        debug!("worker thread {} left to exit with the process", self.slot);
        Ok(())
    }
}
