// External crates
use clap::Parser;
use tracing::debug;

// Internal imports
use rancher_core::rancher_error;
use rancher_logging::LogSettings;

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = rancher_logging::init_with(&LogSettings::from_env_with_debug(args.debug));
    debug!(command = ?args.command, "Starting rancher");

    if let Err(e) = execute_command(args).await {
        rancher_error!("{:#}", e);
        // exit() skips destructors, flush the log file first.
        drop(log_guard);
        std::process::exit(1);
    }
}
