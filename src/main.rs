use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod check;
mod cli;
mod config;
mod console;
mod git;
mod output;
mod paths;
mod sync;
mod util;
mod workflow;

use cli::{Command, RootArgs};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    let config = config::resolve_config(args.config.as_deref())?;

    match args.command {
        Command::Coreget => workflow::run_coreget(&config),
        Command::Corepull => workflow::run_corepull(&config),
        Command::Coresync => workflow::run_coresync(&config),
        Command::Modsync(module) => workflow::run_modsync(&config, module),
        Command::Modinstall(module) => workflow::run_modinstall(&config, module),
        Command::Modcheck(modcheck) => workflow::run_modcheck(&config, modcheck),
        Command::RestartBackend => workflow::run_restart_backend(&config),
        Command::RestartFrontend => workflow::run_restart_frontend(&config),
    }
}
