//! Developer environment configuration.
//!
//! Settings come from built-in defaults, an optional JSON file and a few
//! environment overrides, in that order. The resolved config is passed
//! explicitly to every command.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = "appdev";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_REPO_DIR: &str = "REPO_DIR";
pub const ENV_CORE_DST: &str = "CORE_DST";

const DEFAULT_REPO_URL: &str = "https://github.com/CleepDevice/cleep.git";
const DEFAULT_REPO_DIR_NAME: &str = "cleep-dev";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DevConfig {
    /// Git URL of the core repository.
    pub repo_url: String,
    /// Local checkout of the core repository.
    pub repo_dir: PathBuf,
    /// Installed core package directory; unset when the core is not installed.
    pub core_dst: Option<PathBuf>,
    pub html_dst: PathBuf,
    pub modules_scripts_dst: PathBuf,
    pub bin_dst: PathBuf,
    pub media_dst: PathBuf,
    pub config_dir: PathBuf,
    /// RPC endpoint of the running platform instance.
    pub rpc_url: String,
    /// Service manager unit running the backend.
    pub service_name: String,
    /// Credential helper exported as `GIT_ASKPASS` for git commands.
    pub git_askpass: Option<PathBuf>,
    pub sync_timeout_secs: u64,
    pub git_timeout_secs: u64,
    pub script_timeout_secs: u64,
    pub command_timeout_secs: u64,
}

impl Default for DevConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            repo_dir: home.join(DEFAULT_REPO_DIR_NAME),
            core_dst: None,
            html_dst: PathBuf::from("/opt/cleep/html"),
            modules_scripts_dst: PathBuf::from("/opt/cleep/scripts"),
            bin_dst: PathBuf::from("/usr/bin"),
            media_dst: PathBuf::from("/opt/cleep"),
            config_dir: PathBuf::from("/etc/cleep"),
            rpc_url: "http://127.0.0.1".to_string(),
            service_name: "cleep".to_string(),
            git_askpass: None,
            sync_timeout_secs: 15,
            git_timeout_secs: 60,
            script_timeout_secs: 300,
            command_timeout_secs: 30,
        }
    }
}

/// Default config file location under the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Parse a config file. Missing keys take their defaults.
pub fn load_config_file(path: &Path) -> Result<DevConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: DevConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Apply environment overrides through `lookup`.
pub fn apply_env_overrides(config: &mut DevConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    if let Some(repo_dir) = non_empty(ENV_REPO_DIR) {
        config.repo_dir = PathBuf::from(repo_dir);
    }
    if let Some(core_dst) = non_empty(ENV_CORE_DST) {
        config.core_dst = Some(PathBuf::from(core_dst));
    }
}

/// Resolve the effective config: defaults, then the explicit or default
/// config file, then environment overrides.
pub fn resolve_config(explicit: Option<&Path>) -> Result<DevConfig> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => load_config_file(&path)?,
            None => DevConfig::default(),
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;
    tracing::debug!(
        repo_dir = %config.repo_dir.display(),
        core_installed = config.core_dst.is_some(),
        "resolved config"
    );
    Ok(config)
}

/// Reject configs that cannot drive any command.
pub fn validate_config(config: &DevConfig) -> Result<()> {
    if config.repo_url.trim().is_empty() {
        return Err(anyhow!("repo_url must be non-empty"));
    }
    if config.rpc_url.trim().is_empty() {
        return Err(anyhow!("rpc_url must be non-empty"));
    }
    crate::api::command_url(&config.rpc_url)?;
    if config.service_name.trim().is_empty() {
        return Err(anyhow!("service_name must be non-empty"));
    }
    let timeouts = [
        ("sync_timeout_secs", config.sync_timeout_secs),
        ("git_timeout_secs", config.git_timeout_secs),
        ("script_timeout_secs", config.script_timeout_secs),
        ("command_timeout_secs", config.command_timeout_secs),
    ];
    for (label, value) in timeouts {
        if value == 0 {
            return Err(anyhow!("{label} must be greater than zero"));
        }
    }
    let mut paths = vec![
        ("repo_dir", config.repo_dir.as_path()),
        ("html_dst", config.html_dst.as_path()),
        ("modules_scripts_dst", config.modules_scripts_dst.as_path()),
        ("bin_dst", config.bin_dst.as_path()),
        ("media_dst", config.media_dst.as_path()),
        ("config_dir", config.config_dir.as_path()),
    ];
    if let Some(core_dst) = config.core_dst.as_deref() {
        paths.push(("core_dst", core_dst));
    }
    for (label, path) in paths {
        validate_absolute_path(path, label)?;
    }
    Ok(())
}

fn validate_absolute_path(path: &Path, label: &str) -> Result<()> {
    if !path.is_absolute() {
        return Err(anyhow!(
            "{label} must be an absolute path (got {})",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
