//! Vagrant lifecycle control for the Homestead box.
//!
//! Every mutating transition follows the same path: check that Homestead is
//! usable, start the vagrant subcommand in the background, and once it exits
//! probe `vagrant status` again and hand the fresh [`StatusReport`] to the
//! caller. Only one transition may be in flight per controller; vagrant is not
//! safe to run twice against the same project, so a second request is
//! rejected with [`RancherError::Busy`] instead of being interleaved.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rancher_config::{homestead, HomesteadConfig, LifecycleSettings, SharedSettings};
use rancher_core::{
    CommandOutcome, CommandRunner, CommandSpec, ExistenceProbe, OutputCapture,
    ProcessOutputCapture, ProcessRunner, RancherError, Result, SystemProbe,
};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::existence::Existence;
use crate::status::{classify, VmStatus};

/// A state-changing vagrant command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Up,
    Halt,
    Suspend,
    Destroy,
    Provision,
}

impl Transition {
    /// Arguments passed to vagrant, in order.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Transition::Up => &["up"],
            Transition::Halt => &["halt"],
            Transition::Suspend => &["suspend"],
            // Without --force vagrant waits for a y/N answer on stdin.
            Transition::Destroy => &["destroy", "--force"],
            Transition::Provision => &["provision"],
        }
    }

    pub fn name(&self) -> &'static str {
        self.args()[0]
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse state for icons and menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Summary {
    Missing,
    Up,
    Down,
}

/// What a status probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub exists: bool,
    pub status: VmStatus,
}

impl StatusReport {
    /// Homestead is not usable, so its state could not be asked for.
    pub fn missing() -> Self {
        Self {
            exists: false,
            status: VmStatus::Unknown,
        }
    }

    pub fn summary(&self) -> Summary {
        if !self.exists {
            Summary::Missing
        } else if self.status.is_up() {
            Summary::Up
        } else {
            Summary::Down
        }
    }

    /// Transitions worth offering to a user in this state.
    pub fn available_transitions(&self) -> &'static [Transition] {
        match self.summary() {
            Summary::Missing => &[],
            Summary::Up => &[
                Transition::Provision,
                Transition::Suspend,
                Transition::Halt,
                Transition::Destroy,
            ],
            Summary::Down => &[Transition::Up, Transition::Destroy],
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exists {
            write!(f, "{}", self.status)
        } else {
            f.write_str("missing or not configured")
        }
    }
}

fn vagrant_command(settings: &LifecycleSettings, args: &[&str]) -> CommandSpec {
    CommandSpec::new(&settings.project_dir, &settings.vagrant_path)
        .args(args.iter().copied())
        .timeout(settings.command_timeout())
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| {
        RancherError::Internal(format!(
            "Lifecycle operations need a Tokio runtime: {}",
            e
        ))
    })
}

/// Marks a transition as in flight until dropped.
struct PendingSlot {
    slot: Arc<Mutex<Option<Transition>>>,
}

impl PendingSlot {
    fn claim(slot: &Arc<Mutex<Option<Transition>>>, transition: Transition) -> Result<Self> {
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = *current {
            return Err(RancherError::Busy(format!(
                "cannot {} while '{}' is still running",
                transition, active
            )));
        }
        *current = Some(transition);
        Ok(Self {
            slot: Arc::clone(slot),
        })
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Everything needed to run `vagrant status` and classify the answer.
#[derive(Clone)]
struct StatusProbe {
    settings: SharedSettings,
    capture: Arc<dyn OutputCapture>,
    probe: Arc<dyn ExistenceProbe>,
}

impl StatusProbe {
    async fn run(&self) -> StatusReport {
        let settings = self.settings.snapshot();
        let existence = Existence::check(&settings, self.probe.as_ref());
        if !existence.is_usable() {
            debug!(%existence, "Skipping status probe");
            return StatusReport::missing();
        }

        let spec = vagrant_command(&settings, &["status"]);
        let status = match self.capture.capture(spec).await {
            Ok(output) => {
                let status = classify(&output.combined());
                if status == VmStatus::Unknown {
                    warn!(
                        command = %output.command,
                        exit_code = ?output.exit_code,
                        "Unrecognised vagrant status output"
                    );
                }
                status
            }
            Err(e) => {
                warn!("Status probe failed: {}", e);
                VmStatus::Unknown
            }
        };

        StatusReport {
            exists: true,
            status,
        }
    }
}

pub struct LifecycleController {
    settings: SharedSettings,
    runner: Arc<dyn CommandRunner>,
    capture: Arc<dyn OutputCapture>,
    probe: Arc<dyn ExistenceProbe>,
    pending: Arc<Mutex<Option<Transition>>>,
}

impl LifecycleController {
    /// Controller driving real processes.
    pub fn new(settings: SharedSettings) -> Self {
        Self::with_collaborators(
            settings,
            Arc::new(ProcessRunner),
            Arc::new(ProcessOutputCapture),
            Arc::new(SystemProbe),
        )
    }

    pub fn with_collaborators(
        settings: SharedSettings,
        runner: Arc<dyn CommandRunner>,
        capture: Arc<dyn OutputCapture>,
        probe: Arc<dyn ExistenceProbe>,
    ) -> Self {
        Self {
            settings,
            runner,
            capture,
            probe,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn existence(&self) -> Existence {
        Existence::check(&self.settings.snapshot(), self.probe.as_ref())
    }

    /// The transition currently in flight, if any.
    pub fn pending(&self) -> Option<Transition> {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status_probe(&self) -> StatusProbe {
        StatusProbe {
            settings: self.settings.clone(),
            capture: Arc::clone(&self.capture),
            probe: Arc::clone(&self.probe),
        }
    }

    /// Probes the current state without changing it.
    pub async fn status(&self) -> StatusReport {
        self.status_probe().run().await
    }

    /// Callback flavour of [`LifecycleController::status`].
    pub fn check_status<F>(&self, on_done: F) -> Result<()>
    where
        F: FnOnce(StatusReport) + Send + 'static,
    {
        let runtime = current_runtime()?;
        let probe = self.status_probe();
        runtime.spawn(async move { on_done(probe.run().await) });
        Ok(())
    }

    fn prepare(&self, transition: Transition) -> Result<(CommandSpec, PendingSlot)> {
        let settings = self.settings.snapshot();
        let existence = Existence::check(&settings, self.probe.as_ref());
        if !existence.is_usable() {
            return Err(RancherError::PreconditionFailed(existence.to_string()));
        }
        let slot = PendingSlot::claim(&self.pending, transition)?;
        Ok((vagrant_command(&settings, transition.args()), slot))
    }

    fn start<F>(
        &self,
        runtime: Handle,
        transition: Transition,
        spec: CommandSpec,
        slot: PendingSlot,
        on_done: F,
    ) -> Result<()>
    where
        F: FnOnce(CommandOutcome, StatusReport) + Send + 'static,
    {
        let probe = self.status_probe();
        info!(%transition, command = %spec, "Running vagrant command");

        // If the runner fails to start the command, the closure and the slot
        // inside it are dropped here and the controller is free again.
        let handle = self.runner.run(
            &spec,
            Box::new(move |outcome: CommandOutcome| {
                match outcome {
                    CommandOutcome::Exited(Some(0)) => {
                        debug!(%transition, "vagrant command finished")
                    }
                    CommandOutcome::TimedOut => {
                        warn!(%transition, "vagrant command timed out and was killed")
                    }
                    other => warn!(%transition, outcome = ?other, "vagrant command failed"),
                }
                runtime.spawn(async move {
                    let report = probe.run().await;
                    drop(slot);
                    info!(%transition, status = %report, "Status after vagrant command");
                    on_done(outcome, report);
                });
            }),
        )?;

        debug!(%transition, pid = ?handle.pid(), "vagrant command started");
        Ok(())
    }

    /// Issues `transition` and returns straight away.
    ///
    /// `on_done` receives exactly one report after the command has exited and
    /// the status has been probed again. When Homestead is not usable nothing
    /// is started and `on_done` receives [`StatusReport::missing`]. A busy
    /// controller or a command that cannot be started is reported as `Err`,
    /// and `on_done` is never called.
    pub fn command<F>(&self, transition: Transition, on_done: F) -> Result<()>
    where
        F: FnOnce(StatusReport) + Send + 'static,
    {
        let runtime = current_runtime()?;
        let (spec, slot) = match self.prepare(transition) {
            Ok(prepared) => prepared,
            Err(RancherError::PreconditionFailed(reason)) => {
                info!(%transition, %reason, "Homestead is not usable, skipping command");
                runtime.spawn(async move { on_done(StatusReport::missing()) });
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.start(runtime, transition, spec, slot, move |_, report| on_done(report))
    }

    /// Awaitable flavour of [`LifecycleController::command`].
    ///
    /// Unlike the callback flavour, an unusable Homestead is reported as
    /// [`RancherError::PreconditionFailed`], and a command killed by the
    /// timeout as [`RancherError::Timeout`] once the status has been probed
    /// again.
    pub async fn execute(&self, transition: Transition) -> Result<StatusReport> {
        let runtime = current_runtime()?;
        let (spec, slot) = self.prepare(transition)?;
        let limit = spec.timeout;
        let (tx, rx) = oneshot::channel();
        self.start(runtime, transition, spec, slot, move |outcome, report| {
            let _ = tx.send((outcome, report));
        })?;
        let (outcome, report) = rx.await.map_err(|_| {
            RancherError::Internal(format!("'{}' finished without a status report", transition))
        })?;

        match outcome {
            CommandOutcome::TimedOut => Err(RancherError::Timeout(format!(
                "vagrant {} was killed after {}s, box is {}",
                transition,
                limit.map(|d| d.as_secs()).unwrap_or_default(),
                report
            ))),
            _ => Ok(report),
        }
    }

    pub fn up<F>(&self, on_done: F) -> Result<()>
    where
        F: FnOnce(StatusReport) + Send + 'static,
    {
        self.command(Transition::Up, on_done)
    }

    pub fn halt<F>(&self, on_done: F) -> Result<()>
    where
        F: FnOnce(StatusReport) + Send + 'static,
    {
        self.command(Transition::Halt, on_done)
    }

    pub fn suspend<F>(&self, on_done: F) -> Result<()>
    where
        F: FnOnce(StatusReport) + Send + 'static,
    {
        self.command(Transition::Suspend, on_done)
    }

    pub fn destroy<F>(&self, on_done: F) -> Result<()>
    where
        F: FnOnce(StatusReport) + Send + 'static,
    {
        self.command(Transition::Destroy, on_done)
    }

    pub fn provision<F>(&self, on_done: F) -> Result<()>
    where
        F: FnOnce(StatusReport) + Send + 'static,
    {
        self.command(Transition::Provision, on_done)
    }

    /// Opens a terminal running `vagrant ssh` in the project directory.
    pub fn ssh(&self) -> Result<()> {
        let settings = self.settings.snapshot();
        let spec = CommandSpec::new(&settings.project_dir, &settings.terminal_path)
            .arg(format!(
                "--working-directory={}",
                settings.project_dir.display()
            ))
            .arg("-x")
            .arg(settings.vagrant_path.to_string_lossy())
            .arg("ssh");
        info!(command = %spec, "Opening SSH terminal");
        self.runner.launch(&spec)
    }

    /// Opens `Homestead.yaml` in the configured editor.
    pub fn edit_config(&self) -> Result<()> {
        let settings = self.settings.snapshot();
        let spec = CommandSpec::new(&settings.config_dir, &settings.editor_path)
            .arg(settings.config_file_path().to_string_lossy());
        info!(command = %spec, "Opening Homestead configuration");
        self.runner.launch(&spec)
    }

    /// Reads the display values from `Homestead.yaml`, fresh on every call.
    pub fn parse_config(&self) -> HomesteadConfig {
        homestead::extract_or_default(&self.settings.snapshot().config_file_path())
    }
}
