//! Copy core and module sources into their install locations.
use crate::config::DevConfig;
use crate::console::{self, CommandSpec};
use crate::paths::{ModulePaths, PlatformPaths};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LIFECYCLE_INSTALL_SCRIPTS: [&str; 2] = ["preinst.sh", "postinst.sh"];

/// One rsync transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStep {
    pub src: PathBuf,
    pub dst: PathBuf,
    /// Sync directory contents rather than the directory itself.
    pub contents: bool,
    pub delete: bool,
    pub excludes: Vec<&'static str>,
    pub keep_dirlinks: bool,
}

impl SyncStep {
    fn new(src: PathBuf, dst: PathBuf) -> Self {
        Self {
            src,
            dst,
            contents: true,
            delete: true,
            excludes: Vec::new(),
            keep_dirlinks: false,
        }
    }

    fn excluding(mut self, patterns: &[&'static str]) -> Self {
        self.excludes.extend_from_slice(patterns);
        self
    }

    /// Build the rsync invocation for this step.
    pub fn command(&self, rsync: &Path) -> CommandSpec {
        let with_slash = |path: &Path| format!("{}/", path.display());
        let src = if self.contents {
            with_slash(&self.src)
        } else {
            self.src.display().to_string()
        };
        let dst = if self.contents {
            with_slash(&self.dst)
        } else {
            self.dst.display().to_string()
        };
        let mut spec = CommandSpec::new(rsync).arg("-a").arg(src).arg(dst);
        if self.delete {
            spec = spec.arg("--delete");
        }
        for pattern in &self.excludes {
            spec = spec.arg("--exclude").arg(*pattern);
        }
        if self.keep_dirlinks {
            spec = spec.arg("--keep-dirlinks");
        }
        spec
    }
}

/// Directories created and transfers run by `core_sync`, in order.
pub fn core_sync_plan(paths: &PlatformPaths) -> Result<(Vec<PathBuf>, Vec<SyncStep>)> {
    let core_dst = paths.core_dst()?.to_path_buf();
    let dirs = vec![
        paths.html_dst().to_path_buf(),
        core_dst.join("modules"),
        paths.media_dst().join("modules"),
        paths.config_dir().to_path_buf(),
    ];
    let steps = vec![
        SyncStep {
            keep_dirlinks: true,
            ..SyncStep::new(paths.core_src(), core_dst)
                .excluding(&["/tests/", "modules", "*__pycache__*", "*.pyc"])
        },
        SyncStep::new(paths.html_src(), paths.html_dst().to_path_buf())
            .excluding(&["js/modules/", "*node_modules*"]),
        SyncStep {
            contents: false,
            delete: false,
            ..SyncStep::new(paths.bin_src().join("cleep"), paths.bin_dst().join("cleep"))
        },
        SyncStep::new(
            paths.media_src().join("sounds"),
            paths.media_dst().join("sounds"),
        ),
    ];
    Ok((dirs, steps))
}

/// Transfers run by `module_sync` for the source dirs that exist.
pub fn module_sync_plan(module: &ModulePaths) -> Result<Vec<SyncStep>> {
    let candidates = [
        (
            module.backend_src(),
            module.backend_dst()?.to_path_buf(),
            &["*.pyc", "*__pycache__*"][..],
        ),
        (
            module.frontend_src(),
            module.frontend_dst().to_path_buf(),
            &["*node_modules*"][..],
        ),
        (
            module.scripts_src(),
            module.scripts_dst().to_path_buf(),
            &["*__pycache__*"][..],
        ),
    ];
    Ok(candidates
        .into_iter()
        .filter(|(src, _, _)| src.is_dir())
        .map(|(src, dst, excludes)| SyncStep::new(src, dst).excluding(excludes))
        .collect())
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

fn run_steps(steps: &[SyncStep], timeout: Duration, what: &str) -> Result<()> {
    let rsync = CommandSpec::locate("rsync")?.program;
    for step in steps {
        if let Some(parent) = step.dst.parent() {
            create_dir(parent)?;
        }
        console::run_checked(&step.command(&rsync), timeout, what)?;
    }
    Ok(())
}

/// Synchronize core sources into the installed platform.
pub fn core_sync(config: &DevConfig) -> Result<()> {
    let paths = PlatformPaths::new(config);
    let (dirs, steps) = core_sync_plan(&paths)?;
    for dir in &dirs {
        create_dir(dir)?;
    }
    run_steps(
        &steps,
        Duration::from_secs(config.sync_timeout_secs),
        "core sync",
    )?;
    tracing::info!(core = %paths.core_dst()?.display(), "core synchronized");
    Ok(())
}

/// Synchronize one module's backend, frontend and scripts.
pub fn module_sync(config: &DevConfig, module_name: &str) -> Result<()> {
    let paths = PlatformPaths::new(config);
    let module = paths.module(module_name);
    if !module.src().is_dir() {
        return Err(anyhow!(
            "Module \"{module_name}\" doesn't exist [{}]",
            module.src().display()
        ));
    }
    let steps = module_sync_plan(&module)?;
    for step in &steps {
        create_dir(&step.dst)?;
    }
    run_steps(
        &steps,
        Duration::from_secs(config.sync_timeout_secs),
        "module sync",
    )?;
    tracing::info!(module = module_name, steps = steps.len(), "module synchronized");
    Ok(())
}

/// Run the installed pre/post install scripts of a module, in order.
pub fn run_install_scripts(config: &DevConfig, module_name: &str) -> Result<Vec<PathBuf>> {
    let paths = PlatformPaths::new(config);
    let module = paths.module(module_name);
    if !module.src().is_dir() {
        return Err(anyhow!(
            "Module \"{module_name}\" doesn't exist [{}]",
            module.src().display()
        ));
    }
    let timeout = Duration::from_secs(config.script_timeout_secs);
    let mut ran = Vec::new();
    for name in LIFECYCLE_INSTALL_SCRIPTS {
        let script = module.scripts_dst().join(name);
        if !script.is_file() {
            continue;
        }
        tracing::info!(script = %script.display(), "running install script");
        let spec = CommandSpec::new(&script).current_dir(module.scripts_dst());
        console::run_checked(&spec, timeout, &format!("install script {name}"))?;
        ran.push(script);
    }
    Ok(ran)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(core: Option<&str>) -> PlatformPaths {
        PlatformPaths::new(&DevConfig {
            repo_dir: PathBuf::from("/repo"),
            core_dst: core.map(PathBuf::from),
            ..DevConfig::default()
        })
    }

    #[test]
    fn core_sync_requires_installed_core() {
        let err = core_sync_plan(&paths(None)).expect_err("no core");
        assert!(err.to_string().contains("core must be installed"));
    }

    #[test]
    fn core_sync_plan_mirrors_install_layout() {
        let (dirs, steps) = core_sync_plan(&paths(Some("/lib/cleep"))).expect("plan");
        assert_eq!(dirs[1], PathBuf::from("/lib/cleep/modules"));
        assert_eq!(steps.len(), 4);
        let core = steps[0].command(Path::new("/usr/bin/rsync")).display();
        assert_eq!(
            core,
            "/usr/bin/rsync -a /repo/cleep/ /lib/cleep/ --delete --exclude /tests/ --exclude modules --exclude '*__pycache__*' --exclude '*.pyc' --keep-dirlinks"
        );
        let bin = steps[2].command(Path::new("rsync")).display();
        assert_eq!(bin, "rsync -a /repo/bin/cleep /usr/bin/cleep");
    }

    #[test]
    fn module_sync_plan_skips_missing_sources() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DevConfig {
            repo_dir: dir.path().to_path_buf(),
            core_dst: Some(dir.path().join("core")),
            ..DevConfig::default()
        };
        let module = PlatformPaths::new(&config).module("demo");
        fs::create_dir_all(module.backend_src()).expect("mkdir backend");
        fs::create_dir_all(module.scripts_src()).expect("mkdir scripts");
        let steps = module_sync_plan(&module).expect("plan");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].dst, dir.path().join("core/modules/demo"));
        assert_eq!(steps[1].excludes, vec!["*__pycache__*"]);
    }

    #[test]
    fn install_scripts_run_in_order_and_stop_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DevConfig {
            repo_dir: dir.path().join("repo"),
            modules_scripts_dst: dir.path().join("scripts"),
            ..DevConfig::default()
        };
        fs::create_dir_all(dir.path().join("repo/modules/demo")).expect("mkdir src");
        let scripts = dir.path().join("scripts/demo");
        fs::create_dir_all(&scripts).expect("mkdir scripts");
        write_script(&scripts.join("preinst.sh"), "#!/bin/sh\necho pre >> log.txt\n");
        write_script(&scripts.join("postinst.sh"), "#!/bin/sh\necho post >> log.txt\n");

        let ran = run_install_scripts(&config, "demo").expect("scripts");
        assert_eq!(ran.len(), 2);
        let log = fs::read_to_string(scripts.join("log.txt")).expect("log");
        assert_eq!(log, "pre\npost\n");

        write_script(&scripts.join("preinst.sh"), "#!/bin/sh\nexit 2\n");
        let err = run_install_scripts(&config, "demo").expect_err("failing preinst");
        assert!(err.to_string().contains("install script preinst.sh failed"));
    }

    fn write_script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, body).expect("write script");
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }
}
