//! Clone and update the core repository checkout.
use crate::config::DevConfig;
use crate::console::{self, CommandSpec};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn git_command(config: &DevConfig) -> Result<CommandSpec> {
    let mut spec = CommandSpec::locate("git")?;
    if let Some(askpass) = config.git_askpass.as_ref() {
        spec = spec.env("GIT_ASKPASS", askpass.to_string_lossy());
    }
    Ok(spec)
}

/// `git clone -q <url> <repo_dir>`.
pub fn clone_command(config: &DevConfig) -> Result<CommandSpec> {
    Ok(git_command(config)?
        .arg("clone")
        .arg("-q")
        .arg(config.repo_url.clone())
        .path_arg(&config.repo_dir))
}

/// `git -C <repo_dir> pull -q`.
pub fn pull_command(config: &DevConfig) -> Result<CommandSpec> {
    Ok(git_command(config)?
        .arg("-C")
        .path_arg(&config.repo_dir)
        .arg("pull")
        .arg("-q"))
}

fn ensure_modules_dir(repo_dir: &Path) -> Result<()> {
    let modules = repo_dir.join("modules");
    fs::create_dir_all(&modules).with_context(|| format!("create {}", modules.display()))
}

/// Clone the core repository into the configured checkout directory.
pub fn clone_core(config: &DevConfig) -> Result<()> {
    tracing::info!(
        url = %config.repo_url,
        dir = %config.repo_dir.display(),
        "cloning core repository"
    );
    let spec = clone_command(config)?;
    console::run_checked(
        &spec,
        Duration::from_secs(config.git_timeout_secs),
        "core clone",
    )?;
    ensure_modules_dir(&config.repo_dir)
}

/// Pull the latest core changes into the checkout.
pub fn pull_core(config: &DevConfig) -> Result<()> {
    tracing::info!(dir = %config.repo_dir.display(), "pulling core repository");
    let spec = pull_command(config)?;
    console::run_checked(
        &spec,
        Duration::from_secs(config.git_timeout_secs),
        "core pull",
    )?;
    ensure_modules_dir(&config.repo_dir)
}
