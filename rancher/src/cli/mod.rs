// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "rancher")]
#[command(about = "Start, stop and inspect a Laravel Homestead box")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a rancher settings file
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Homestead checkout containing the Vagrantfile
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Directory containing Homestead.yaml
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// vagrant executable to run
    #[arg(long, global = true)]
    pub vagrant: Option<PathBuf>,

    /// Kill a vagrant command after this many seconds (0 waits forever)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show whether Homestead is set up and what state the box is in
    Status,
    /// Boot the box
    Up,
    /// Shut the box down
    Halt,
    /// Save the box state and stop it
    Suspend,
    /// Delete the box
    Destroy,
    /// Re-run the provisioners on a running box
    Provision,
    /// Open a terminal with an SSH session into the box
    Ssh,
    /// Open Homestead.yaml in the configured editor
    Edit,
    /// Show the values read from Homestead.yaml
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
