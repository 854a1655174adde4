//! Command implementations wired from the CLI.
use crate::api;
use crate::check::{self, CheckSummary};
use crate::cli::{ModcheckArgs, ModuleArgs};
use crate::config::DevConfig;
use crate::git;
use crate::output;
use crate::paths::PlatformPaths;
use crate::sync;
use anyhow::{anyhow, Context, Result};
use std::io;

pub fn run_coreget(config: &DevConfig) -> Result<()> {
    git::clone_core(config)?;
    println!("cloned core into {}", config.repo_dir.display());
    Ok(())
}

pub fn run_corepull(config: &DevConfig) -> Result<()> {
    git::pull_core(config)?;
    println!("updated {}", config.repo_dir.display());
    Ok(())
}

pub fn run_coresync(config: &DevConfig) -> Result<()> {
    sync::core_sync(config)?;
    println!("core synchronized");
    Ok(())
}

pub fn run_modsync(config: &DevConfig, args: ModuleArgs) -> Result<()> {
    sync::module_sync(config, &args.module)?;
    println!("module \"{}\" synchronized", args.module);
    Ok(())
}

pub fn run_modinstall(config: &DevConfig, args: ModuleArgs) -> Result<()> {
    let ran = sync::run_install_scripts(config, &args.module)?;
    if ran.is_empty() {
        println!("module \"{}\" has no install script", args.module);
    }
    for script in ran {
        println!("ran {}", script.display());
    }
    Ok(())
}

/// Run the selected checks and print their summary.
///
/// Fatal check errors abort immediately; reported errors fail the command
/// after the summary is printed.
pub fn run_modcheck(config: &DevConfig, args: ModcheckArgs) -> Result<()> {
    let paths = PlatformPaths::new(config);
    let (backend, frontend, scripts) = args.selection();
    let mut summary = CheckSummary::default();
    if backend {
        summary.backend = Some(check::check_backend(&paths, &args.module)?);
    }
    if frontend {
        summary.frontend = Some(check::check_frontend(&paths, &args.module)?);
    }
    if scripts {
        summary.scripts = Some(check::check_scripts(&paths, &args.module)?);
    }

    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize check summary")?;
        println!("{text}");
    } else {
        output::write_summary(&mut io::stdout().lock(), &args.module, &summary)
            .context("write check summary")?;
    }

    if summary.has_errors() {
        return Err(anyhow!("module \"{}\" has check errors", args.module));
    }
    Ok(())
}

pub fn run_restart_backend(config: &DevConfig) -> Result<()> {
    api::restart_backend(config)?;
    println!("backend restarted");
    Ok(())
}

pub fn run_restart_frontend(config: &DevConfig) -> Result<()> {
    api::restart_frontend(config)?;
    println!("frontend restart requested");
    Ok(())
}
