//! Typed paths into the development checkout and the installed platform.
use crate::config::DevConfig;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Python package name of the platform core.
pub const CORE_PACKAGE: &str = "cleep";
/// Package holding installed application modules.
pub const MODULES_PACKAGE: &str = "cleep.modules";

/// Source and install locations derived from a [`DevConfig`].
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    repo_dir: PathBuf,
    core_dst: Option<PathBuf>,
    html_dst: PathBuf,
    modules_scripts_dst: PathBuf,
    bin_dst: PathBuf,
    media_dst: PathBuf,
    config_dir: PathBuf,
}

impl PlatformPaths {
    pub fn new(config: &DevConfig) -> Self {
        Self {
            repo_dir: config.repo_dir.clone(),
            core_dst: config.core_dst.clone(),
            html_dst: config.html_dst.clone(),
            modules_scripts_dst: config.modules_scripts_dst.clone(),
            bin_dst: config.bin_dst.clone(),
            media_dst: config.media_dst.clone(),
            config_dir: config.config_dir.clone(),
        }
    }

    /// Return `<repo>/cleep`.
    pub fn core_src(&self) -> PathBuf {
        self.repo_dir.join(CORE_PACKAGE)
    }

    /// Return `<repo>/html`.
    pub fn html_src(&self) -> PathBuf {
        self.repo_dir.join("html")
    }

    /// Return `<repo>/modules`.
    pub fn modules_src(&self) -> PathBuf {
        self.repo_dir.join("modules")
    }

    /// Return `<repo>/bin`.
    pub fn bin_src(&self) -> PathBuf {
        self.repo_dir.join("bin")
    }

    /// Return `<repo>/medias`.
    pub fn media_src(&self) -> PathBuf {
        self.repo_dir.join("medias")
    }

    /// Installed core directory; an error when the core is not installed.
    pub fn core_dst(&self) -> Result<&Path> {
        self.core_dst
            .as_deref()
            .ok_or_else(|| {
                anyhow!(
                    "core must be installed (set core_dst or {})",
                    crate::config::ENV_CORE_DST
                )
            })
    }

    /// Return `<core_dst>/modules`.
    pub fn modules_dst(&self) -> Result<PathBuf> {
        Ok(self.core_dst()?.join("modules"))
    }

    pub fn html_dst(&self) -> &Path {
        &self.html_dst
    }

    /// Return `<html_dst>/js/modules`.
    pub fn modules_html_dst(&self) -> PathBuf {
        self.html_dst.join("js").join("modules")
    }

    pub fn modules_scripts_dst(&self) -> &Path {
        &self.modules_scripts_dst
    }

    pub fn bin_dst(&self) -> &Path {
        &self.bin_dst
    }

    pub fn media_dst(&self) -> &Path {
        &self.media_dst
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Paths of one application module.
    pub fn module(&self, name: &str) -> ModulePaths {
        ModulePaths {
            name: name.to_string(),
            src: self.modules_src().join(name),
            backend_dst: self.core_dst.as_ref().map(|core| core.join("modules").join(name)),
            frontend_dst: self.modules_html_dst().join(name),
            scripts_dst: self.modules_scripts_dst.join(name),
        }
    }
}

/// Source and install locations of one application module.
#[derive(Debug, Clone)]
pub struct ModulePaths {
    name: String,
    src: PathBuf,
    backend_dst: Option<PathBuf>,
    frontend_dst: PathBuf,
    scripts_dst: PathBuf,
}

impl ModulePaths {
    /// Return `<repo>/modules/<name>`.
    pub fn src(&self) -> &Path {
        &self.src
    }

    pub fn backend_src(&self) -> PathBuf {
        self.src.join("backend")
    }

    pub fn frontend_src(&self) -> PathBuf {
        self.src.join("frontend")
    }

    pub fn scripts_src(&self) -> PathBuf {
        self.src.join("scripts")
    }

    /// Return `<core_dst>/modules/<name>`.
    pub fn backend_dst(&self) -> Result<&Path> {
        self.backend_dst
            .as_deref()
            .ok_or_else(|| {
                anyhow!(
                    "core must be installed to locate backend of module \"{}\"",
                    self.name
                )
            })
    }

    /// Return `<html_dst>/js/modules/<name>`.
    pub fn frontend_dst(&self) -> &Path {
        &self.frontend_dst
    }

    /// Return `<modules_scripts_dst>/<name>`.
    pub fn scripts_dst(&self) -> &Path {
        &self.scripts_dst
    }

    /// Main backend source file, `<backend_dst>/<name>.py`.
    pub fn main_file(&self) -> Result<PathBuf> {
        Ok(self.backend_dst()?.join(format!("{}.py", self.name)))
    }
}
