//! Seeding tool process runner
//!
//! One [`CommandRunner::run`] call owns one child process from spawn to
//! exit. Its outcome is decided once, by the value the call returns, so
//! output, stderr, exit and error events can never resolve it twice.
//!
//! On unix the tool runs in its own process group. A cancelled run
//! interrupts the whole group with SIGINT so the tool can stop the workers
//! it forked, and kills the group if it is still alive after a grace period.

use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tileseed_core::config::MapproxyConfig;
use tileseed_core::SeedMode;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ProcessError;

/// Program and arguments for one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCommand {
    program: String,
    args: Vec<String>,
}

impl SeedCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// The standard seeding tool invocation for `mode`
    pub fn seed(mapproxy: &MapproxyConfig, mode: SeedMode, skip_uncached: bool) -> Self {
        let command = Self::new(&mapproxy.seed_command)
            .arg("-f")
            .path_arg(&mapproxy.config_path)
            .arg("-s")
            .path_arg(&mapproxy.seed_spec_path)
            .arg("--concurrency")
            .arg(mapproxy.seed_concurrency.to_string())
            .arg("--progress-file")
            .path_arg(&mapproxy.progress_file(mode))
            .arg("--continue");

        if skip_uncached {
            command.arg("--skip-uncached")
        } else {
            command
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for SeedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Cancellation for a single invocation, carrying the reason it was
/// triggered with. The first reason wins.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop
    pub fn cancel(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// Resolves once [`Cancellation::cancel`] has been called
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    fn aborted(&self) -> ProcessError {
        ProcessError::Aborted(self.reason().unwrap_or_default().to_string())
    }
}

/// Runs the seeding tool
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion, passing each stdout line to `on_line`.
    ///
    /// `on_line` may cancel `cancellation`; the child is then killed and the
    /// run fails with [`ProcessError::Aborted`].
    async fn run(
        &self,
        command: &SeedCommand,
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
        cancellation: &Cancellation,
    ) -> Result<(), ProcessError>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    interrupt_grace: Duration,
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl TokioProcessRunner {
    pub fn new(interrupt_grace: Duration) -> Self {
        Self { interrupt_grace }
    }

    pub fn from_config(mapproxy: &MapproxyConfig) -> Self {
        Self::new(mapproxy.interrupt_grace())
    }

    /// Stop a cancelled child and reap it
    async fn stop(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            match signal_group(pid, libc::SIGINT) {
                Ok(()) => match tokio::time::timeout(self.interrupt_grace, child.wait()).await {
                    Ok(status) => {
                        debug!(status = ?status, "process stopped after interrupt");
                        // workers the tool failed to stop
                        let _ = signal_group(pid, libc::SIGKILL);
                        return;
                    }
                    Err(_) => {
                        warn!(
                            grace_ms = self.interrupt_grace.as_millis() as u64,
                            "process ignored interrupt, killing its process group"
                        );
                        let _ = signal_group(pid, libc::SIGKILL);
                    }
                },
                Err(e) => warn!(error = %e, "failed to interrupt process group"),
            }
        }

        if let Err(e) = child.start_kill() {
            debug!(error = %e, "kill after cancellation failed");
        }
        let _ = child.wait().await;
    }
}

/// Send `signal` to the process group led by `pid`
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: kill(2) takes plain integers and touches no memory of ours
    if unsafe { libc::kill(-pgid, signal) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

enum Step {
    Cancelled,
    Line(std::io::Result<Option<String>>),
    Exited(std::io::Result<ExitStatus>),
}

async fn next_line(lines: &mut Option<Lines<BufReader<ChildStdout>>>) -> std::io::Result<Option<String>> {
    match lines {
        Some(lines) => lines.next_line().await,
        None => Ok(None),
    }
}

#[async_trait]
impl CommandRunner for TokioProcessRunner {
    async fn run(
        &self,
        command: &SeedCommand,
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
        cancellation: &Cancellation,
    ) -> Result<(), ProcessError> {
        let mut process = Command::new(command.program());
        process
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        process.process_group(0);
        let mut child = process.spawn().map_err(ProcessError::Spawn)?;

        debug!(pid = ?child.id(), "process started");

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut last = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!(target: "tileseed::stderr", "{}", line);
                    let line = line.trim();
                    if !line.is_empty() {
                        last = line.to_string();
                    }
                }
            }
            last
        });

        let mut lines = child.stdout.take().map(|stdout| BufReader::new(stdout).lines());
        let mut stdout_open = lines.is_some();
        let mut stream_error = None;

        let status = loop {
            let step = tokio::select! {
                biased;
                _ = cancellation.cancelled() => Step::Cancelled,
                line = next_line(&mut lines), if stdout_open => Step::Line(line),
                status = child.wait(), if !stdout_open => Step::Exited(status),
            };

            match step {
                Step::Cancelled => {
                    self.stop(&mut child).await;
                    stderr_task.abort();
                    return Err(cancellation.aborted());
                }
                Step::Line(Ok(Some(line))) => on_line(&line),
                Step::Line(Ok(None)) => stdout_open = false,
                Step::Line(Err(e)) => {
                    debug!(error = %e, "stdout stream failed, waiting for exit");
                    stream_error = Some(e);
                    stdout_open = false;
                    // closing the pipe keeps a chatty child from blocking on it
                    lines = None;
                }
                Step::Exited(Ok(status)) => break status,
                Step::Exited(Err(e)) => {
                    stderr_task.abort();
                    return Err(ProcessError::Stream(e));
                }
            }
        };

        let last_stderr = stderr_task.await.unwrap_or_default();
        debug!(code = ?status.code(), "process exited");

        if cancellation.is_cancelled() {
            return Err(cancellation.aborted());
        }
        if !status.success() {
            return Err(ProcessError::Exited {
                code: status.code(),
                last_stderr,
            });
        }
        if let Some(e) = stream_error {
            return Err(ProcessError::Stream(e));
        }
        Ok(())
    }
}
