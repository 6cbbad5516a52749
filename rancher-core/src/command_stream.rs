//! Asynchronous process execution.
//!
//! Two flavours live here. [`CommandRunner`] starts a program in the
//! background and reports nothing but its exit. [`OutputCapture`] runs a
//! program to completion and hands back what it printed. Neither blocks the
//! calling thread; both need a Tokio runtime.

// Standard library
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

// External crates
use futures_util::future::BoxFuture;
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{RancherError, Result};

/// Everything needed to start one external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub working_dir: PathBuf,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Kill the process once it has been running this long.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(working_dir: impl Into<PathBuf>, program: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program and arguments joined by spaces, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null());
        // A timed command leads its own process group, which a timeout kills
        // as a whole. Untimed commands stay in ours and still see Ctrl-C.
        #[cfg(unix)]
        if self.timeout.is_some() {
            command.process_group(0);
        }
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> RancherError {
        RancherError::Spawn {
            command: self.command_line(),
            source,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// How a started process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The process exited on its own. `None` when it was killed by a signal.
    Exited(Option<i32>),
    /// The process outlived [`CommandSpec::timeout`] and was killed.
    TimedOut,
    /// Waiting on the process failed; its fate is unknown.
    WaitFailed,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        matches!(self, CommandOutcome::Exited(Some(0)))
    }
}

pub type ExitCallback = Box<dyn FnOnce(CommandOutcome) + Send + 'static>;

/// Watch on a started process.
///
/// Dropping the handle does not stop the process or the watch; the exit
/// callback still runs when the process ends.
#[derive(Debug)]
pub struct CommandHandle {
    pid: Option<u32>,
    command: String,
    watch: JoinHandle<()>,
}

impl CommandHandle {
    pub fn new(pid: Option<u32>, command: String, watch: JoinHandle<()>) -> Self {
        Self {
            pid,
            command,
            watch,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_finished(&self) -> bool {
        self.watch.is_finished()
    }

    /// Resolves once the exit callback has returned (or panicked).
    pub async fn finished(self) {
        if let Err(e) = self.watch.await {
            warn!(command = %self.command, "Exit callback did not complete: {}", e);
        }
    }
}

/// Starts programs without capturing their output.
pub trait CommandRunner: Send + Sync {
    /// Starts `spec` and returns immediately.
    ///
    /// `on_exit` is called exactly once when the process ends, whatever its
    /// exit code. If the process cannot be started the error is returned here
    /// and `on_exit` is dropped without being called.
    fn run(&self, spec: &CommandSpec, on_exit: ExitCallback) -> Result<CommandHandle>;

    /// Starts `spec` with nobody waiting on the result.
    fn launch(&self, spec: &CommandSpec) -> Result<()> {
        let command = spec.command_line();
        self.run(
            spec,
            Box::new(move |outcome: CommandOutcome| debug!(%command, ?outcome, "Detached command finished")),
        )
        .map(|_| ())
    }
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: &CommandSpec, on_exit: ExitCallback) -> Result<CommandHandle> {
        let runtime = Handle::try_current().map_err(|e| {
            RancherError::Internal(format!(
                "'{}' must be started from inside a Tokio runtime: {}",
                spec, e
            ))
        })?;

        let mut child = spec
            .to_command()
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spec.spawn_error(e))?;

        let pid = child.id();
        let command = spec.command_line();
        debug!(%command, ?pid, "Started command");

        let timeout = spec.timeout;
        let watched = command.clone();
        let watch = runtime.spawn(async move {
            let outcome = wait_for_exit(&mut child, timeout, &watched).await;
            // Release the child before handing control to the callback.
            drop(child);
            debug!(command = %watched, ?outcome, "Command exited");
            on_exit(outcome);
        });

        Ok(CommandHandle::new(pid, command, watch))
    }
}

async fn wait_for_exit(child: &mut Child, timeout: Option<Duration>, command: &str) -> CommandOutcome {
    let waited = match timeout {
        None => child.wait().await,
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(waited) => waited,
            Err(_) => {
                warn!(
                    command,
                    timeout_secs = limit.as_secs(),
                    "Command timed out, killing it"
                );
                kill_tree(child, command).await;
                return CommandOutcome::TimedOut;
            }
        },
    };

    match waited {
        Ok(status) => CommandOutcome::Exited(status.code()),
        Err(e) => {
            warn!(command, "Failed waiting for command: {}", e);
            CommandOutcome::WaitFailed
        }
    }
}

/// Kills `child` together with anything it started in its process group.
async fn kill_tree(child: &mut Child, command: &str) {
    if let Some(pid) = child.id() {
        if let Err(e) = kill_process_group(pid) {
            warn!(command, pid, "Failed to kill process group: {}", e);
        }
    }
    if let Err(e) = child.kill().await {
        warn!(command, "Failed to kill timed out command: {}", e);
    }
}

/// SIGKILLs the process group led by `pid`. An already empty group is not an error.
#[cfg(unix)]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pid)
        .map_err(|_| std::io::Error::from_raw_os_error(Errno::EINVAL as i32))?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(std::io::Error::from_raw_os_error(errno as i32)),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) -> std::io::Result<()> {
    Ok(())
}

/// Text collected from a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs a program to completion and collects its output.
pub trait OutputCapture: Send + Sync {
    fn capture(&self, spec: CommandSpec) -> BoxFuture<'static, Result<CapturedOutput>>;
}

/// [`OutputCapture`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOutputCapture;

impl OutputCapture for ProcessOutputCapture {
    fn capture(&self, spec: CommandSpec) -> BoxFuture<'static, Result<CapturedOutput>> {
        Box::pin(async move {
            let command = spec.command_line();
            let child = spec
                .to_command()
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| spec.spawn_error(e))?;

            let pid = child.id();

            // On timeout the pending future is dropped, which kills the child.
            // Whatever it started in its group goes too.
            let output = match spec.timeout {
                None => child.wait_with_output().await?,
                Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                    Ok(output) => output?,
                    Err(_) => {
                        if let Some(pid) = pid {
                            if let Err(e) = kill_process_group(pid) {
                                warn!(%command, pid, "Failed to kill process group: {}", e);
                            }
                        }
                        return Err(RancherError::Timeout(format!(
                            "'{}' did not finish within {}s",
                            command,
                            limit.as_secs()
                        )));
                    }
                },
            };

            debug!(%command, code = ?output.status.code(), "Captured command output");
            Ok(CapturedOutput {
                command,
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
