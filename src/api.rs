//! Requests to a running platform instance.
use crate::config::DevConfig;
use crate::console::{self, CommandSpec};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::time::Duration;
use ureq::http::Uri;

const COMMAND_PATH: &str = "/command";

#[derive(Debug, Serialize)]
struct CommandRequest<'a> {
    to: &'a str,
    command: &'a str,
}

/// Command endpoint on the same origin as `rpc_url`.
pub fn command_url(rpc_url: &str) -> Result<String> {
    let uri: Uri = rpc_url
        .parse()
        .with_context(|| format!("rpc_url is not a valid URL (got {rpc_url:?})"))?;
    let scheme = uri
        .scheme()
        .cloned()
        .ok_or_else(|| anyhow!("rpc_url must include a scheme (got {rpc_url:?})"))?;
    let authority = uri
        .authority()
        .filter(|authority| !authority.host().is_empty())
        .cloned()
        .ok_or_else(|| anyhow!("rpc_url must include a host (got {rpc_url:?})"))?;
    let command = Uri::builder()
        .scheme(scheme)
        .authority(authority)
        .path_and_query(COMMAND_PATH)
        .build()
        .with_context(|| format!("build command URL from {rpc_url:?}"))?;
    Ok(command.to_string())
}

/// Restart the backend service through the service manager.
pub fn restart_backend(config: &DevConfig) -> Result<()> {
    let spec = CommandSpec::locate("systemctl")?
        .arg("restart")
        .arg(config.service_name.clone());
    console::run_checked(
        &spec,
        Duration::from_secs(config.command_timeout_secs),
        "backend restart",
    )?;
    tracing::info!(service = %config.service_name, "backend restarted");
    Ok(())
}

/// Ask the running instance to reload its frontend.
pub fn restart_frontend(config: &DevConfig) -> Result<()> {
    let url = command_url(&config.rpc_url)?;
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(config.command_timeout_secs)))
        .build()
        .into();
    let request = CommandRequest {
        to: "developer",
        command: "restart_frontend",
    };
    tracing::debug!(url = %url, "posting frontend restart command");
    let response = agent
        .post(&url)
        .send_json(&request)
        .map_err(|err| anyhow!("Error occured while requesting \"{url}\": {err}"))?;
    tracing::info!(status = response.status().as_u16(), "frontend restart requested");
    Ok(())
}
