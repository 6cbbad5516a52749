// Command handlers for the Homestead box

use std::time::Duration;

use anyhow::{Context, Result};
use rancher_config::{LifecycleSettings, SharedSettings};
use rancher_provider::{LifecycleController, Transition};
use tracing::debug;

use crate::cli::{Args, Command};

pub mod config;
pub mod lifecycle;

/// Loads settings, applies command-line overrides on top.
pub fn load_settings(args: &Args) -> Result<SharedSettings> {
    let settings = match &args.settings {
        Some(path) => LifecycleSettings::load(path),
        None => LifecycleSettings::load_default(),
    }
    .context("Failed to load rancher settings")?;

    let shared = SharedSettings::new(settings);
    if let Some(dir) = &args.project_dir {
        shared.set_project_dir(dir);
    }
    if let Some(dir) = &args.config_dir {
        shared.set_config_dir(dir);
    }
    if let Some(path) = &args.vagrant {
        shared.set_vagrant_path(path);
    }
    if let Some(secs) = args.timeout {
        shared.set_command_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    Ok(shared)
}

/// Main command dispatcher
#[must_use = "command execution results should be handled"]
pub async fn execute_command(args: Args) -> Result<()> {
    let settings = load_settings(&args)?;
    debug!(settings = ?settings.snapshot(), "Effective settings");
    let controller = LifecycleController::new(settings);

    match args.command {
        Command::Status => lifecycle::handle_status(&controller).await,
        Command::Up => lifecycle::handle_transition(&controller, Transition::Up).await,
        Command::Halt => lifecycle::handle_transition(&controller, Transition::Halt).await,
        Command::Suspend => lifecycle::handle_transition(&controller, Transition::Suspend).await,
        Command::Destroy => lifecycle::handle_transition(&controller, Transition::Destroy).await,
        Command::Provision => {
            lifecycle::handle_transition(&controller, Transition::Provision).await
        }
        Command::Ssh => lifecycle::handle_ssh(&controller),
        Command::Edit => config::handle_edit(&controller),
        Command::Config { json } => config::handle_show(&controller, json),
    }
}
