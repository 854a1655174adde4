//! CLI argument parsing for the application developer workflow.
//!
//! Each command maps to one workflow function; arguments carry no policy.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "appdev",
    version,
    about = "Develop platform applications: sync sources, run installs and check modules",
    after_help = "Examples:\n  appdev coreget\n  appdev coresync\n  appdev modsync --module audio\n  appdev modcheck --module audio --backend\n  appdev modcheck --module audio --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Config file (defaults to <user config dir>/appdev/config.json when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone the core repository
    Coreget,
    /// Pull the latest core changes
    Corepull,
    /// Synchronize core sources into the installed platform
    Coresync,
    /// Synchronize a module's backend, frontend and scripts
    Modsync(ModuleArgs),
    /// Run a module's install scripts
    Modinstall(ModuleArgs),
    /// Check a module's backend, frontend and scripts
    Modcheck(ModcheckArgs),
    /// Restart the backend service
    RestartBackend,
    /// Ask the running instance to reload its frontend
    RestartFrontend,
}

/// Inputs shared by single-module commands.
#[derive(Args, Debug)]
pub struct ModuleArgs {
    /// Module name
    #[arg(long, value_name = "NAME")]
    pub module: String,
}

#[derive(Args, Debug)]
pub struct ModcheckArgs {
    /// Module name
    #[arg(long, value_name = "NAME")]
    pub module: String,

    /// Check the installed backend
    #[arg(long)]
    pub backend: bool,

    /// Check the installed frontend against desc.json
    #[arg(long)]
    pub frontend: bool,

    /// Check the install scripts in the module sources
    #[arg(long)]
    pub scripts: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

impl ModcheckArgs {
    /// Checks to run; no selector means all of them.
    pub fn selection(&self) -> (bool, bool, bool) {
        if self.backend || self.frontend || self.scripts {
            (self.backend, self.frontend, self.scripts)
        } else {
            (true, true, true)
        }
    }
}
